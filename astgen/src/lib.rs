use heck::ToSnakeCase;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::{
    parse::{Parse, ParseStream, Result},
    punctuated::Punctuated,
    Ident, Token, Type,
};

/// Generates a closed AST from a list of node shapes:
/// ```text
/// generate_ast!(
///     $AST_NAME,
///     [$(NODE_NAME => { $($FIELD_NAME: $FIELD_TYPE),* });+]
/// )
/// ```
///
/// For example:
/// ```text
/// generate_ast!(
///     Expr,
///     [
///         IntLiteral => { literal: Token };
///         BinaryOp   => { left: Box<Expr>, op: Token, right: Box<Expr> };
///     ]
/// )
/// ```
///
/// expands to `enum Expr { IntLiteral(IntLiteral), BinaryOp(BinaryOp) }`, one
/// struct per node, `Expr::new_int_literal(..)` style constructors, a
/// `Visitor<T>` trait with one `visit_<node>_expr` method per node, and
/// `Expr::accept` to dispatch a node to its visitor method.
#[proc_macro]
pub fn generate_ast(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as Ast);
    match ast.check_unique_nodes() {
        Ok(()) => ast.expand().into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct Ast {
    name: Ident,
    nodes: Punctuated<AstNode, Token![;]>,
}

struct AstNode {
    name: Ident,
    fields: Punctuated<Field, Token![,]>,
}

struct Field {
    name: Ident,
    ty: Type,
}

impl Parse for Ast {
    fn parse(input: ParseStream) -> Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<Token![,]>()?;
        let nodes_input;
        syn::bracketed!(nodes_input in input);
        let nodes = nodes_input.parse_terminated(AstNode::parse, Token![;])?;
        Ok(Ast { name, nodes })
    }
}

impl Parse for AstNode {
    fn parse(input: ParseStream) -> Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<Token![=>]>()?;
        let fields_input;
        syn::braced!(fields_input in input);
        let fields = fields_input.parse_terminated(Field::parse, Token![,])?;
        Ok(AstNode { name, fields })
    }
}

impl Parse for Field {
    fn parse(input: ParseStream) -> Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let ty: Type = input.parse()?;
        Ok(Field { name, ty })
    }
}

impl Ast {
    fn check_unique_nodes(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.to_string()) {
                return Err(syn::Error::new(
                    node.name.span(),
                    format!("node `{}` is declared twice in `{}`", node.name, self.name),
                ))
            }
        }
        Ok(())
    }

    fn expand(&self) -> TokenStream2 {
        let name = &self.name;
        let node_names: Vec<&Ident> = self.nodes.iter().map(|n| &n.name).collect();
        let visit_names: Vec<Ident> = self.nodes.iter().map(|n| self.visit_name(n)).collect();
        let structs = self.nodes.iter().map(AstNode::struct_tokens);
        let constructors = self.nodes.iter().map(|n| n.constructor_tokens(name));

        quote! {
            #[derive(Clone, Debug, PartialEq)]
            pub enum #name {
                #(#node_names(#node_names)),*
            }

            #(#structs)*

            pub(crate) trait Visitor<T> {
                #(fn #visit_names(&mut self, node: &#node_names) -> T;)*
            }

            impl #name {
                #(#constructors)*

                pub(crate) fn accept<T, V: Visitor<T>>(&self, v: &mut V) -> T {
                    match self {
                        #(#name::#node_names(node) => v.#visit_names(node),)*
                    }
                }
            }
        }
    }

    fn visit_name(&self, node: &AstNode) -> Ident {
        format_ident!(
            "visit_{}_{}",
            node.name.to_string().to_snake_case(),
            self.name.to_string().to_lowercase()
        )
    }
}

impl AstNode {
    fn struct_tokens(&self) -> TokenStream2 {
        let name = &self.name;
        let field_names = self.fields.iter().map(|f| &f.name);
        let field_types = self.fields.iter().map(|f| &f.ty);
        quote! {
            #[derive(Clone, Debug, PartialEq)]
            pub struct #name {
                #(pub(crate) #field_names: #field_types),*
            }
        }
    }

    fn constructor_tokens(&self, ast_name: &Ident) -> TokenStream2 {
        let name = &self.name;
        let fn_name = format_ident!("new_{}", name.to_string().to_snake_case());
        let field_names: Vec<&Ident> = self.fields.iter().map(|f| &f.name).collect();
        let field_types = self.fields.iter().map(|f| &f.ty);
        quote! {
            pub(crate) fn #fn_name(#(#field_names: #field_types),*) -> Self {
                #ast_name::#name(#name { #(#field_names),* })
            }
        }
    }
}
