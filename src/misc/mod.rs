pub mod lnx_config;
pub mod utils;
