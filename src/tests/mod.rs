pub mod sync_tests;
