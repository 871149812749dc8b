mod test_class_table;
mod test_declarations;
mod test_errors;
mod test_expressions;
mod test_scripts;
mod test_statements;
mod test_strings;
