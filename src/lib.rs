//! # rwproxy
//!
//! A read/write splitting connection router. It wraps any database driver and
//! presents one logical connection over a cluster of one writer and zero or
//! more read replicas.
//!
//! ## Features
//!
//! - **Lazy Connections** - Writer and reader connections are opened on first use
//! - **Read/Write Routing** - Writes go to the writer, reads to a replica
//! - **Round-Robin Replicas** - One rotation shared by every connection of a driver
//! - **Writer Fallback** - Reads silently fall back to the writer when no replica is reachable
//! - **Transaction Pinning** - Every operation inside a transaction uses one physical connection
//! - **Capability Negotiation** - Optional fast paths are used only when the wrapped driver offers them
//!
//! ## Cluster Address
//!
//! A cluster address is a `;` separated list. The first non-empty segment is the
//! writer and the rest are readers, in order:
//!
//! ```rust
//! use rwproxy::driver::routing::{make_cluster_address, ClusterAddress};
//!
//! let address = make_cluster_address("primary:5432", ["replica1:5432", "replica2:5432"]);
//! assert_eq!(address, "primary:5432;replica1:5432;replica2:5432");
//!
//! let parsed = ClusterAddress::parse(&address).unwrap();
//! assert_eq!(parsed.writer().address(), "primary:5432");
//! assert_eq!(parsed.readers().len(), 2);
//! ```
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! # use rwproxy::{Connection, Driver, DriverResult};
//! # struct PgDriver;
//! # impl Driver for PgDriver {
//! #     fn open(&self, _address: &str) -> DriverResult<Box<dyn Connection>> {
//! #         unimplemented!()
//! #     }
//! # }
//! use rwproxy::{Context, RoutingDriver, TransactionOptions, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Wrap the underlying driver
//! let driver = RoutingDriver::new(PgDriver);
//! let conn = driver.open("primary:5432;replica1:5432;replica2:5432")?;
//!
//! // Writes are prepared and executed on the writer
//! let mut insert = conn.prepare("INSERT INTO users (name) VALUES ($1)")?;
//! insert.exec(&[Value::from("Alice")])?;
//!
//! // Reads go to a replica
//! let mut select = conn.prepare("SELECT name FROM users")?;
//! let mut rows = select.query(&[])?;
//! while let Some(row) = rows.next_row()? {
//!     println!("{:?}", row);
//! }
//!
//! // Read-only transactions are tried on the replica first
//! let mut tx = conn.begin_transaction(&Context::background(), &TransactionOptions::read_only())?;
//! tx.commit()?;
//!
//! conn.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Options are applied in order and later options win:
//!
//! ```rust
//! # use rwproxy::{Connection, Driver, DriverResult};
//! # struct PgDriver;
//! # impl Driver for PgDriver {
//! #     fn open(&self, _address: &str) -> DriverResult<Box<dyn Connection>> {
//! #         unimplemented!()
//! #     }
//! # }
//! use rwproxy::{DriverOption, RoutingDriver, RoutingPolicy};
//!
//! let driver = RoutingDriver::with_options(
//!     PgDriver,
//!     vec![
//!         DriverOption::routing_policy(RoutingPolicy::Random),
//!         DriverOption::log(|line| eprintln!("{}", line)),
//!     ],
//! );
//!
//! // Only the address is checked at open time
//! assert!(driver.open(";;").is_err());
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`DriverResult`]. A second `begin` on a connection that
//! is still in a transaction reports a bad connection so the surrounding pool
//! can discard it:
//!
//! ```rust
//! use rwproxy::DriverError;
//!
//! fn should_discard(err: &DriverError) -> bool {
//!     err.is_bad_connection()
//! }
//!
//! assert!(should_discard(&DriverError::bad_connection("begin called while already in a transaction")));
//! assert!(DriverError::Skip("execute").is_skip());
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Routing driver, virtual connections, statements and transactions
//! - [`driver::routing`] - Cluster addresses and reader selection
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod driver;

// Re-exports for convenience
pub use driver::{
    Connection, ConnectionCapabilities, Driver, Rows, Statement, StatementCapabilities,
    Transaction,
    RoutingDriver, DriverOption, LogSink,
    VirtualConnection, PreparedStatement, RoutedTransaction,
    TransactionOptions, TransactionState, IsolationLevel,
    Context, CancelHandle,
    Value, NamedValue, ExecResult,
    DriverError, DriverResult,
};

pub use driver::routing::{ClusterAddress, RoutingPolicy, ServerSelector};
