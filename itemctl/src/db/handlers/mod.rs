pub mod in_memory;
pub mod postgres;
pub mod repository;

#[cfg(test)]
mod tests;

pub use in_memory::InMemoryItemStore;
pub use postgres::PostgresItemStore;
pub use repository::ItemStore;
