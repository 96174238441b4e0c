pub mod note;
pub mod room;
pub mod user;
pub mod view;

pub use note::{Note, NotePatch};
pub use room::{is_valid_slug, NewRoom, Room};
pub use user::UserSummary;
pub use view::{NoteView, RoomView};
