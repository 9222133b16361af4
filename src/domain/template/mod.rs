pub mod template_evaluator;
