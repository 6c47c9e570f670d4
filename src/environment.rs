use std::collections::HashMap;

use log::debug;

use crate::{
    error::{Error, Result},
    stmt::FunctionDeclare,
    token::Token,
    value::Value,
};

/// Variables visible to one activation: the top level or a single function
/// call. Frames never chain to their caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct VariableTable {
    values: HashMap<String, Option<Value>>,
}

impl VariableTable {
    pub(crate) fn new() -> Self {
        Self { values: HashMap::new() }
    }

    /// Registers `name` with no value yet.
    pub(crate) fn declare(&mut self, name: &Token) -> Result<()> {
        if self.values.contains_key(&name.lexeme) {
            return Err(Error::name(
                name,
                format!("Variable '{}' is already declared in this scope.", name.lexeme)
            ))
        }
        self.values.insert(name.lexeme.clone(), None);
        Ok(())
    }

    pub(crate) fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        self.values.get_mut(&name.lexeme)
            .map(|v| *v = Some(value))
            .ok_or_else(|| undeclared_var_error(name))
    }

    pub(crate) fn get(&self, name: &Token) -> Result<Value> {
        match self.values.get(&name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(Error::name(
                name,
                format!("Variable '{}' is declared but has no value assigned.", name.lexeme)
            )),
            None => Err(undeclared_var_error(name)),
        }
    }
}

fn undeclared_var_error(name: &Token) -> Error {
    Error::name(name, format!("Variable '{}' is not declared.", name.lexeme))
}

/// Every function in the program. Declarations are global and happen once.
#[derive(Debug, Default)]
pub(crate) struct FunctionTable {
    functions: HashMap<String, FunctionDeclare>,
}

impl FunctionTable {
    pub(crate) fn new() -> Self {
        Self { functions: HashMap::new() }
    }

    pub(crate) fn define(&mut self, declaration: &FunctionDeclare) -> Result<()> {
        let name = &declaration.name;
        if self.functions.contains_key(&name.lexeme) {
            return Err(Error::name(
                name,
                format!("Function '{}' is already declared.", name.lexeme)
            ))
        }
        debug!("declaring function '{}' with {} parameter(s)", name.lexeme, declaration.params.len());
        self.functions.insert(name.lexeme.clone(), declaration.clone());
        Ok(())
    }

    /// Looks up `name` and checks the call supplies exactly its parameters.
    pub(crate) fn get(&self, name: &Token, arg_count: usize) -> Result<&FunctionDeclare> {
        let function = self.functions.get(&name.lexeme)
            .ok_or_else(|| Error::name(name, format!("Function '{}' is not defined.", name.lexeme)))?;

        if function.params.len() != arg_count {
            return Err(Error::name(
                name,
                format!(
                    "Function '{}' expects {} argument(s) but got {}.",
                    name.lexeme, function.params.len(), arg_count
                )
            ))
        }
        Ok(function)
    }
}
