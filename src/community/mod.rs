pub mod corpus;
pub mod louvain;
pub mod term_ranking;
