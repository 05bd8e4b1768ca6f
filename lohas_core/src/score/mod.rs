pub mod score_rule;
