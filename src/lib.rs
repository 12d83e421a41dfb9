pub mod ip;
pub mod link;
pub mod misc;
pub mod router;

pub type InterfaceId = usize;
