mod cache;
mod granting;
mod store;
