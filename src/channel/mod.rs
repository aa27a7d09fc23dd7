pub mod delivery;
pub mod sender;

pub use delivery::{Delivery, DeliveryChannel, DrainReport};
pub use sender::{BatchSender, HttpSender, SendError};
