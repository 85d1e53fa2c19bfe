//! Attribute bounds enforced on every insert.

pub const MIN_TABLE_NAME_LEN: usize = 1;
pub const MAX_TABLE_NAME_LEN: usize = 100;

pub const MIN_LOCATION_LEN: usize = 2;
pub const MAX_LOCATION_LEN: usize = 255;

pub const MIN_CUSTOMER_NAME_LEN: usize = 1;
pub const MAX_CUSTOMER_NAME_LEN: usize = 100;

pub const MIN_SEATS: u32 = 1;
pub const MIN_DURATION_MINUTES: u32 = 1;
