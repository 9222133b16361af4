pub mod query_results_state;
