//! Canonical directory column names the engine reads or writes by name.
//!
//! Every other column is opaque: it is carried through by header position
//! and never interpreted.

pub const TIMESTAMP: &str = "Timestamp";
pub const ADDRESS: &str = "Address";
pub const PARCEL: &str = "Parcel";
pub const EMAIL: &str = "Email-1";
pub const FIRST_NAME: &str = "First Name";
pub const LAST_NAME: &str = "Last Name";
pub const UNIT_MANAGER: &str = "Unit Manager";

/// Street number, name and type derived from `Address`.
pub const ST_NUMBER: &str = "ST #";
pub const ST_NAME: &str = "ST Name";
pub const ST_TYPE: &str = "ST Type";

/// Fields that receive a value on insert when left empty.
pub const EMAIL_TYPE: &str = "Email Type-1";
pub const NEWSLETTER: &str = "Newsletter";
pub const STATUS: &str = "Status";
pub const ENTRY_TYPE: &str = "Entry Type";
