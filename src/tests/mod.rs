//! Cross-module test suite: normalization properties over real provider
//! payloads, the fallback policy driven by in-process fake sources, and the
//! conditions service wired to unreachable hosts.

mod data_tests;
