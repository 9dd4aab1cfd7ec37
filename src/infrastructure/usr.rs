//! Symbol identifiers for Rust declarations.
//!
//! An identifier is the identifier of the enclosing declaration followed by one
//! `@<tag>@<name>` segment. Nothing positional goes in, so the same declaration
//! gets the same identifier wherever it is written. Identifiers never contain a
//! space: the text dump separates fields with spaces.

use quote::ToTokens;
use syn::{FnArg, ForeignItem, GenericParam, Generics, ImplItem, Item, TraitItem};

use crate::domain::ast::NodeKind;
use crate::domain::error::SymbolError;
use crate::infrastructure::syn_ast::{param_ident, Syn, SynNode};
use crate::ports::SymbolIdentifier;

pub const USR_PREFIX: &str = "rs:";

/// Scope segment opened by a closure.
pub(crate) const CLOSURE_SEGMENT: &str = "@CL";

/// Stands in for whitespace that separates two words inside token text.
const WORD_SEPARATOR: char = '+';

pub struct UsrGenerator;

impl<'ast> SymbolIdentifier<SynNode<'ast>> for UsrGenerator {
    fn identify(&self, decl: &SynNode<'ast>) -> Result<String, SymbolError> {
        decl.identifier()
    }
}

/// `scope` + `segment`, with `#<ordinal>` for every repeat after the first.
pub(crate) fn qualify(scope: &str, segment: &str, ordinal: usize) -> String {
    if ordinal == 0 {
        format!("{}{}", scope, segment)
    } else {
        format!("{}{}#{}", scope, segment, ordinal)
    }
}

/// The part of a declaration's identifier that it adds to its scope.
pub(crate) fn segment(node: &Syn<'_>) -> Result<String, SymbolError> {
    let kind = node.kind_name();
    if node.node_kind() == NodeKind::Statement {
        return Err(SymbolError::NotADeclaration { kind });
    }
    let unnamed = || SymbolError::Unnamed { kind };

    let segment = match node {
        Syn::Unit(unit) => {
            let mut usr = String::from(USR_PREFIX);
            if let Some(name) = &unit.crate_name {
                usr.push_str(&format!("@CR@{}", without_spaces(name)));
            }
            for module in &unit.module_path {
                usr.push_str(&format!("@M@{}", without_spaces(module)));
            }
            usr
        }
        Syn::Item(item) => match item {
            Item::Const(c) => format!("@C@{}", c.ident),
            Item::Enum(e) => format!("@E@{}", e.ident),
            Item::ExternCrate(c) => format!("@XC@{}", c.ident),
            Item::Fn(f) => format!("@F@{}", f.sig.ident),
            Item::ForeignMod(m) => format!(
                "@XB@{}",
                m.abi
                    .name
                    .as_ref()
                    .map(|abi| without_spaces(&abi.value()))
                    .unwrap_or_else(|| "C".to_string())
            ),
            Item::Impl(i) => match &i.trait_ {
                Some((negative, path, _)) => format!(
                    "@I@{}{}>{}",
                    if negative.is_some() { "!" } else { "" },
                    compact(path),
                    compact(&*i.self_ty)
                ),
                None => format!("@I@{}", compact(&*i.self_ty)),
            },
            Item::Macro(m) => match &m.ident {
                Some(ident) => format!("@MA@{}", ident),
                None => return Err(unnamed()),
            },
            Item::Mod(m) => format!("@M@{}", m.ident),
            Item::Static(s) => format!("@ST@{}", s.ident),
            Item::Struct(s) => format!("@S@{}", s.ident),
            Item::Trait(t) => format!("@T@{}", t.ident),
            Item::TraitAlias(t) => format!("@TA@{}", t.ident),
            Item::Type(t) => format!("@TY@{}", t.ident),
            Item::Union(u) => format!("@UN@{}", u.ident),
            Item::Use(u) => format!("@U@{}", compact(&u.tree)),
            _ => return Err(unnamed()),
        },
        Syn::Derived {
            trait_path,
            target,
            generics,
        } => format!(
            "@I@{}>{}{}",
            compact(&**trait_path),
            target,
            generic_args(generics)
        ),
        Syn::TraitItem(item) => match item {
            TraitItem::Const(c) => format!("@C@{}", c.ident),
            TraitItem::Fn(f) => format!("@F@{}", f.sig.ident),
            TraitItem::Type(t) => format!("@TY@{}", t.ident),
            _ => return Err(unnamed()),
        },
        Syn::ImplItem(item) => match item {
            ImplItem::Const(c) => format!("@C@{}", c.ident),
            ImplItem::Fn(f) => format!("@F@{}", f.sig.ident),
            ImplItem::Type(t) => format!("@TY@{}", t.ident),
            _ => return Err(unnamed()),
        },
        Syn::ForeignItem(item) => match item {
            ForeignItem::Fn(f) => format!("@F@{}", f.sig.ident),
            ForeignItem::Static(s) => format!("@ST@{}", s.ident),
            ForeignItem::Type(t) => format!("@TY@{}", t.ident),
            _ => return Err(unnamed()),
        },
        Syn::Variant(variant) => format!("@V@{}", variant.ident),
        Syn::Field { field, index } => match &field.ident {
            Some(ident) => format!("@FI@{}", ident),
            None => format!("@FI@{}", index),
        },
        Syn::Generic(param) => match param {
            GenericParam::Type(t) => format!("@TP@{}", t.ident),
            GenericParam::Lifetime(l) => format!("@LT@{}", l.lifetime.ident),
            GenericParam::Const(c) => format!("@CP@{}", c.ident),
        },
        Syn::Param { arg, index } => match arg {
            FnArg::Receiver(_) => "@P@self".to_string(),
            FnArg::Typed(typed) => match param_ident(&typed.pat) {
                Some(ident) => format!("@P@{}", ident),
                None => format!("@P#{}", index),
            },
        },
        Syn::ClosureParam { pat, index } => match param_ident(pat) {
            Some(ident) => format!("@P@{}", ident),
            None => format!("@P#{}", index),
        },
        Syn::Binding(binding) => format!("@L@{}", binding.ident),
        Syn::Local(_) | Syn::Macro(_) | Syn::Arm(_) | Syn::Expr(_) => {
            return Err(SymbolError::NotADeclaration { kind })
        }
    };
    Ok(segment)
}

/// `<'a,T,N>` built from a declaration's generic parameters, empty when there are none.
fn generic_args(generics: &Generics) -> String {
    if generics.params.is_empty() {
        return String::new();
    }
    let args: Vec<String> = generics
        .params
        .iter()
        .map(|param| match param {
            GenericParam::Type(t) => t.ident.to_string(),
            GenericParam::Lifetime(l) => format!("'{}", l.lifetime.ident),
            GenericParam::Const(c) => c.ident.to_string(),
        })
        .collect();
    format!("<{}>", args.join(","))
}

/// Names taken from outside the token stream (file names, ABI strings).
fn without_spaces(name: &str) -> String {
    name.replace(char::is_whitespace, &WORD_SEPARATOR.to_string())
}

/// Token text without whitespace; a break between two words becomes `+`
/// (`&'a mut dyn Tr` -> `&'a+mut+dyn+Tr`).
pub(crate) fn compact<T: ToTokens + ?Sized>(node: &T) -> String {
    let text = node.to_token_stream().to_string();
    let chars: Vec<char> = text.chars().collect();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            if let (Some(p), Some(n)) = (prev, next) {
                if is_word(p) && is_word(n) && !out.ends_with(WORD_SEPARATOR) {
                    out.push(WORD_SEPARATOR);
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}
