//! Database Front Layer
//!
//! Generic handles parameterized over a [`Driver`](crate::driver::Driver).
//!
//! ## Architecture
//!
//! Ownership runs strictly one way, so plain reference counting suffices:
//! - **Database / Connection** (`connection.rs`): shared backend state and sessions
//! - **Statement** (`statement.rs`): the `unprepared → prepared → executed` state machine
//! - **Rowset** (`rowset.rs`): the forward-only, batch-refilling cursor
//! - **Row / Field** (`row.rs`): views onto the cursor's current row
//!
//! ## Threading
//!
//! Every call blocks until the backend answers. Handles are `!Send`; callers
//! needing concurrency open one database per thread.
pub mod connection;
pub mod row;
pub mod rowset;
pub mod statement;

pub use connection::*;
pub use row::*;
pub use rowset::*;
pub use statement::*;

/// Rows per driver fetch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 32;
