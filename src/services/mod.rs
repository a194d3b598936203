pub mod rule_service;
