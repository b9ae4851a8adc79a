pub mod input;
pub mod status;

pub use status::{RoomStatus, StatusBoard, StatusReceiver};
