//! CLI command implementations.
//!
//! Each command runs against any [`SearchEngine`](crate::SearchEngine) and
//! returns the JSON value the binary prints on stdout.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `create-index` | Create a k-NN index (optionally replacing it) |
//! | `delete-index` | Delete an index |
//! | `upsert` | Write records from a JSON file |
//! | `fetch` | Print a stored document |
//! | `delete` | Delete a document |
//! | `search` | Filtered nearest-neighbor search |
//! | `compile-filter` | Print the compiled `bool` body of a filter (offline) |
//!
//! # Example Usage
//!
//! ```bash
//! vectorgate create-index movies --dimension 384 --space-type cosinesimil
//! vectorgate upsert movies records.json
//! vectorgate search movies --vector '[0.1, 0.2, ...]' \
//!     --filter '{"genre": {"$in": ["comedy"]}}' --limit 5 --metadata
//! vectorgate compile-filter '{"$and": [{"tags": "a"}, {"tags": "b"}]}'
//! ```

mod documents;
mod index;
mod search;

pub use documents::{delete_document, fetch_document, read_records, upsert_file};
pub use index::{CreateIndexArgs, create_index, delete_index};
pub use search::{compile_filter, parse_filter, parse_vector, search};
