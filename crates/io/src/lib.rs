// File-backed stores for the reconciliation engine

pub mod csv;
pub mod directory;
pub mod intake;
pub mod outbox;

pub use directory::CsvDirectory;
pub use intake::CsvIntake;
pub use outbox::OutboxNotifier;
