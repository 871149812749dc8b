mod test_bytecode;
mod test_codegen;
mod test_completion;
mod test_config;
mod test_driver;
mod test_enums;
mod test_hierarchy;
mod test_resolve;
mod test_scope;
mod test_verifier;
