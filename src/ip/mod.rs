pub mod checksum;
pub mod forwarding;
pub mod packet;
pub mod protocol;
pub mod rip_builder;
pub mod rip_message;
pub mod routing_table;
