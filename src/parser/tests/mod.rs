mod document;
mod schema;
