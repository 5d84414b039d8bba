//! SQLite database handle for the Parley server.

parley_core::define_database!(ChatDatabase, "Chat database migrations complete");
