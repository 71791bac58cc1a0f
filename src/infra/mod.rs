pub mod supabase_store;

pub use supabase_store::SupabaseStore;
