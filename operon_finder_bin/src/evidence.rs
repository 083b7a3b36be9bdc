//! Parsers for the external evidence tables consumed by the scorers: alignment
//! hits against STRING proteins, STRING protein links, KofamScan KO assignments
//! with the KO to pathway map, and the pre-trained HMM emission matrix.

pub mod alignment;
pub mod emission;
pub mod kegg;
pub mod links;
