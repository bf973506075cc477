pub mod cold_start;
pub mod genre_vector;
pub mod retriever;
pub mod taxonomy;

pub use cold_start::ColdStartCatalog;
pub use genre_vector::GenreVectorBuilder;
pub use retriever::{cosine_similarity, SimilarUserSearch, UserSimilarityIndex};
pub use taxonomy::Taxonomy;
