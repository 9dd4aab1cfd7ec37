//! Rust front-end: exposes a parsed `syn::File` as a tree of declaration and
//! statement nodes.
//!
//! Nodes are thin handles (`SynNode<'ast>`) borrowing from the `TranslationUnit`;
//! children are produced on demand and dropped once walked.

use proc_macro2::{Delimiter, Span, TokenTree};
use quote::ToTokens;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Arm, Attribute, Block, Expr, Field, Fields, FnArg, ForeignItem, GenericParam, Generics,
    Ident, ImplItem, Item, Local, Pat, PatIdent, RangeLimits, Signature, Stmt, StmtMacro,
    Token, TraitItem, UnOp, Variant, Visibility,
};

use crate::domain::ast::{AstNode, NodeKind, Position};
use crate::domain::error::SymbolError;
use crate::infrastructure::project_loader::SourceUnit;
use crate::infrastructure::usr;

/// One parsed source file plus the naming context its identifiers hang off.
pub struct TranslationUnit {
    pub path: String,
    pub crate_name: Option<String>,
    pub module_path: Vec<String>,
    pub file: syn::File,
}

impl TranslationUnit {
    pub fn parse(unit: &SourceUnit) -> syn::Result<Self> {
        let file = syn::parse_file(&unit.source)?;
        Ok(Self {
            path: unit.path.clone(),
            crate_name: unit.crate_name.clone(),
            module_path: unit.module_path.clone(),
            file,
        })
    }

    pub fn root(&self) -> SynNode<'_> {
        SynNode {
            syn: Syn::Unit(self),
            scope: Scope::new(String::new()),
        }
    }
}

/// Handle to one node of a `TranslationUnit`.
#[derive(Clone)]
pub struct SynNode<'ast> {
    pub(crate) syn: Syn<'ast>,
    pub(crate) scope: Rc<Scope>,
}

impl SynNode<'_> {
    /// Scope identifier plus this declaration's segment. Declarations that would
    /// otherwise share an identifier inside one scope (two inherent impls of a type,
    /// shadowed locals) get `#1`, `#2`, ... in the order they are first identified.
    pub(crate) fn identifier(&self) -> Result<String, SymbolError> {
        let segment = usr::segment(&self.syn)?;
        let ordinal = match self.syn.address() {
            Some(address) => self.scope.ordinal(&segment, address),
            None => 0,
        };
        Ok(usr::qualify(&self.scope.id, &segment, ordinal))
    }
}

/// Identifier of the nearest enclosing declaration, shared by everything declared
/// directly inside it.
pub(crate) struct Scope {
    pub(crate) id: String,
    /// Segment -> nodes that produced it, in first-seen order.
    seen: RefCell<HashMap<String, Vec<usize>>>,
}

impl Scope {
    fn new(id: String) -> Rc<Self> {
        Rc::new(Self {
            id,
            seen: RefCell::default(),
        })
    }

    /// Position of `node` among the nodes of this scope that produced `segment`.
    /// Stable for a node once assigned.
    fn ordinal(&self, segment: &str, node: usize) -> usize {
        let mut seen = self.seen.borrow_mut();
        let nodes = seen.entry(segment.to_string()).or_default();
        match nodes.iter().position(|n| *n == node) {
            Some(index) => index,
            None => {
                nodes.push(node);
                nodes.len() - 1
            }
        }
    }
}

fn addr_of<T>(node: &T) -> usize {
    node as *const T as usize
}

#[derive(Clone)]
pub(crate) enum Syn<'ast> {
    Unit(&'ast TranslationUnit),
    Item(&'ast Item),
    /// Impl synthesized from a `#[derive(..)]` attribute.
    Derived {
        trait_path: Rc<syn::Path>,
        target: &'ast Ident,
        generics: &'ast Generics,
    },
    TraitItem(&'ast TraitItem),
    ImplItem(&'ast ImplItem),
    ForeignItem(&'ast ForeignItem),
    Variant(&'ast Variant),
    Field {
        field: &'ast Field,
        index: usize,
    },
    Generic(&'ast GenericParam),
    Param {
        arg: &'ast FnArg,
        index: usize,
    },
    ClosureParam {
        pat: &'ast Pat,
        index: usize,
    },
    Binding(&'ast PatIdent),
    Local(&'ast Local),
    Macro(&'ast StmtMacro),
    Arm(&'ast Arm),
    Expr(&'ast Expr),
}

impl<'ast> Syn<'ast> {
    /// Address of the syntax a declaration stands for; synthesized and root nodes
    /// have none and never need an ordinal.
    fn address(&self) -> Option<usize> {
        let address = match self {
            Syn::Unit(_) | Syn::Derived { .. } => return None,
            Syn::Item(item) => addr_of(*item),
            Syn::TraitItem(item) => addr_of(*item),
            Syn::ImplItem(item) => addr_of(*item),
            Syn::ForeignItem(item) => addr_of(*item),
            Syn::Variant(variant) => addr_of(*variant),
            Syn::Field { field, .. } => addr_of(*field),
            Syn::Generic(param) => addr_of(*param),
            Syn::Param { arg, .. } => addr_of(*arg),
            Syn::ClosureParam { pat, .. } => addr_of(*pat),
            Syn::Binding(binding) => addr_of(*binding),
            Syn::Local(local) => addr_of(*local),
            Syn::Macro(mac) => addr_of(*mac),
            Syn::Arm(arm) => addr_of(*arm),
            Syn::Expr(expr) => addr_of(*expr),
        };
        Some(address)
    }

    pub(crate) fn node_kind(&self) -> NodeKind {
        match self {
            Syn::Local(_) | Syn::Macro(_) | Syn::Arm(_) | Syn::Expr(_) => NodeKind::Statement,
            _ => NodeKind::Declaration,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Syn::Unit(_) => "TranslationUnitDecl",
            Syn::Item(item) => item_kind(item),
            Syn::Derived { .. } => "ImplDecl",
            Syn::TraitItem(item) => match item {
                TraitItem::Const(_) => "ConstDecl",
                TraitItem::Fn(_) => "MethodDecl",
                TraitItem::Type(_) => "TypeAliasDecl",
                TraitItem::Macro(_) => "MacroDecl",
                _ => "VerbatimDecl",
            },
            Syn::ImplItem(item) => match item {
                ImplItem::Const(_) => "ConstDecl",
                ImplItem::Fn(_) => "MethodDecl",
                ImplItem::Type(_) => "TypeAliasDecl",
                ImplItem::Macro(_) => "MacroDecl",
                _ => "VerbatimDecl",
            },
            Syn::ForeignItem(item) => match item {
                ForeignItem::Fn(_) => "FunctionDecl",
                ForeignItem::Static(_) => "StaticDecl",
                ForeignItem::Type(_) => "TypeAliasDecl",
                ForeignItem::Macro(_) => "MacroDecl",
                _ => "VerbatimDecl",
            },
            Syn::Variant(_) => "VariantDecl",
            Syn::Field { .. } => "FieldDecl",
            Syn::Generic(param) => match param {
                GenericParam::Type(_) => "TypeParamDecl",
                GenericParam::Lifetime(_) => "LifetimeParamDecl",
                GenericParam::Const(_) => "ConstParamDecl",
            },
            Syn::Param { arg, .. } => match arg {
                FnArg::Receiver(_) => "SelfParamDecl",
                FnArg::Typed(_) => "ParamDecl",
            },
            Syn::ClosureParam { .. } => "ParamDecl",
            Syn::Binding(_) => "VarDecl",
            Syn::Local(_) => "LetStmt",
            Syn::Macro(_) => "MacroStmt",
            Syn::Arm(_) => "MatchArm",
            Syn::Expr(expr) => expr_kind(expr),
        }
    }
}

fn item_kind(item: &Item) -> &'static str {
    match item {
        Item::Const(_) => "ConstDecl",
        Item::Enum(_) => "EnumDecl",
        Item::ExternCrate(_) => "ExternCrateDecl",
        Item::Fn(_) => "FunctionDecl",
        Item::ForeignMod(_) => "ExternBlockDecl",
        Item::Impl(_) => "ImplDecl",
        Item::Macro(_) => "MacroDecl",
        Item::Mod(_) => "ModuleDecl",
        Item::Static(_) => "StaticDecl",
        Item::Struct(_) => "StructDecl",
        Item::Trait(_) => "TraitDecl",
        Item::TraitAlias(_) => "TraitAliasDecl",
        Item::Type(_) => "TypeAliasDecl",
        Item::Union(_) => "UnionDecl",
        Item::Use(_) => "UseDecl",
        _ => "VerbatimDecl",
    }
}

fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Array(_) => "ArrayExpr",
        Expr::Assign(_) => "AssignExpr",
        Expr::Async(_) => "AsyncBlockExpr",
        Expr::Await(_) => "AwaitExpr",
        Expr::Binary(_) => "BinaryExpr",
        Expr::Block(_) => "BlockExpr",
        Expr::Break(_) => "BreakStmt",
        Expr::Call(_) => "CallExpr",
        Expr::Cast(_) => "CastExpr",
        Expr::Closure(_) => "ClosureExpr",
        Expr::Const(_) => "ConstBlockExpr",
        Expr::Continue(_) => "ContinueStmt",
        Expr::Field(_) => "FieldExpr",
        Expr::ForLoop(_) => "ForStmt",
        Expr::Group(_) => "GroupExpr",
        Expr::If(_) => "IfStmt",
        Expr::Index(_) => "IndexExpr",
        Expr::Infer(_) => "InferExpr",
        Expr::Let(_) => "LetExpr",
        Expr::Lit(_) => "LitExpr",
        Expr::Loop(_) => "LoopStmt",
        Expr::Macro(_) => "MacroExpr",
        Expr::Match(_) => "MatchExpr",
        Expr::MethodCall(_) => "MethodCallExpr",
        Expr::Paren(_) => "ParenExpr",
        Expr::Path(_) => "PathExpr",
        Expr::Range(_) => "RangeExpr",
        Expr::Reference(_) => "ReferenceExpr",
        Expr::Repeat(_) => "RepeatExpr",
        Expr::Return(_) => "ReturnStmt",
        Expr::Struct(_) => "StructExpr",
        Expr::Try(_) => "TryExpr",
        Expr::TryBlock(_) => "TryBlockExpr",
        Expr::Tuple(_) => "TupleExpr",
        Expr::Unary(_) => "UnaryExpr",
        Expr::Unsafe(_) => "UnsafeBlockExpr",
        Expr::Verbatim(_) => "VerbatimExpr",
        Expr::While(_) => "WhileStmt",
        Expr::Yield(_) => "YieldExpr",
        _ => "Expr",
    }
}

impl<'ast> AstNode for SynNode<'ast> {
    fn node_kind(&self) -> NodeKind {
        self.syn.node_kind()
    }

    fn kind_name(&self) -> &'static str {
        self.syn.kind_name()
    }

    fn begin(&self) -> Option<Position> {
        let span = match &self.syn {
            Syn::Unit(_) => return Some(Position::new(1, 1)),
            syn => begin_span(syn)?,
        };

        let start = span.start();
        // Line 0 means the span carries no source information.
        (start.line > 0).then(|| Position::new(start.line, start.column + 1))
    }

    fn is_implicit(&self) -> bool {
        matches!(self.syn, Syn::Derived { .. })
    }

    fn children(&self) -> Vec<Self> {
        let scope = match &self.syn {
            Syn::Expr(closure @ Expr::Closure(_)) => {
                let ordinal = self.scope.ordinal(usr::CLOSURE_SEGMENT, addr_of(*closure));
                Scope::new(usr::qualify(&self.scope.id, usr::CLOSURE_SEGMENT, ordinal))
            }
            node if node.node_kind() == NodeKind::Declaration => match self.identifier() {
                Ok(id) => Scope::new(id),
                Err(_) => self.scope.clone(),
            },
            _ => self.scope.clone(),
        };

        let mut children = Children {
            scope,
            out: Vec::new(),
        };
        children.of(self.syn.clone());
        children.out
    }
}

/// Span of a node's first token after its outer attributes, read from the node's
/// leading fields so that the cost does not grow with the size of its subtree.
fn begin_span(node: &Syn<'_>) -> Option<Span> {
    let span = match node {
        Syn::Unit(_) => return None,
        Syn::Item(item) => return item_span(item),
        Syn::Derived { trait_path, .. } => path_span(trait_path),
        Syn::TraitItem(item) => match item {
            TraitItem::Const(c) => c.const_token.span(),
            TraitItem::Fn(f) => signature_span(&f.sig),
            TraitItem::Type(t) => t.type_token.span(),
            TraitItem::Macro(m) => path_span(&m.mac.path),
            other => return first_span(other),
        },
        Syn::ImplItem(item) => match item {
            ImplItem::Const(c) => vis_span(&c.vis)
                .or(c.defaultness.map(|d| d.span()))
                .unwrap_or_else(|| c.const_token.span()),
            ImplItem::Fn(f) => vis_span(&f.vis)
                .or(f.defaultness.map(|d| d.span()))
                .unwrap_or_else(|| signature_span(&f.sig)),
            ImplItem::Type(t) => vis_span(&t.vis)
                .or(t.defaultness.map(|d| d.span()))
                .unwrap_or_else(|| t.type_token.span()),
            ImplItem::Macro(m) => path_span(&m.mac.path),
            other => return first_span(other),
        },
        Syn::ForeignItem(item) => match item {
            ForeignItem::Fn(f) => vis_span(&f.vis).unwrap_or_else(|| signature_span(&f.sig)),
            ForeignItem::Static(s) => vis_span(&s.vis).unwrap_or_else(|| s.static_token.span()),
            ForeignItem::Type(t) => vis_span(&t.vis).unwrap_or_else(|| t.type_token.span()),
            ForeignItem::Macro(m) => path_span(&m.mac.path),
            other => return first_span(other),
        },
        Syn::Variant(variant) => variant.ident.span(),
        Syn::Field { field, .. } => match (vis_span(&field.vis), &field.ident) {
            (Some(span), _) => span,
            (None, Some(ident)) => ident.span(),
            (None, None) => return first_span(&field.ty),
        },
        Syn::Generic(param) => match param {
            GenericParam::Type(t) => t.ident.span(),
            GenericParam::Lifetime(l) => l.lifetime.span(),
            GenericParam::Const(c) => c.const_token.span(),
        },
        Syn::Param { arg, .. } => match arg {
            FnArg::Receiver(receiver) => match (&receiver.reference, &receiver.mutability) {
                (Some((and, _)), _) => and.span(),
                (None, Some(mutability)) => mutability.span(),
                (None, None) => receiver.self_token.span(),
            },
            FnArg::Typed(typed) => return pat_span(&typed.pat),
        },
        Syn::ClosureParam { pat, .. } => return pat_span(pat),
        Syn::Binding(binding) => binding_span(binding),
        Syn::Local(local) => local.let_token.span(),
        Syn::Macro(mac) => path_span(&mac.mac.path),
        Syn::Arm(arm) => return pat_span(&arm.pat),
        Syn::Expr(expr) => return expr_span(expr),
    };
    Some(span)
}

fn vis_span(vis: &Visibility) -> Option<Span> {
    match vis {
        Visibility::Inherited => None,
        vis => Some(vis.span()),
    }
}

fn path_span(path: &syn::Path) -> Span {
    match (&path.leading_colon, path.segments.first()) {
        (Some(colon), _) => colon.span(),
        (None, Some(segment)) => segment.ident.span(),
        (None, None) => path.span(),
    }
}

fn signature_span(sig: &Signature) -> Span {
    sig.constness
        .map(|t| t.span())
        .or(sig.asyncness.map(|t| t.span()))
        .or(sig.unsafety.map(|t| t.span()))
        .or(sig.abi.as_ref().map(|abi| abi.extern_token.span()))
        .unwrap_or_else(|| sig.fn_token.span())
}

fn binding_span(binding: &PatIdent) -> Span {
    binding
        .by_ref
        .map(|t| t.span())
        .or(binding.mutability.map(|t| t.span()))
        .unwrap_or_else(|| binding.ident.span())
}

fn item_span(item: &Item) -> Option<Span> {
    let (vis, keyword) = match item {
        Item::Const(c) => (&c.vis, c.const_token.span()),
        Item::Enum(e) => (&e.vis, e.enum_token.span()),
        Item::ExternCrate(c) => (&c.vis, c.extern_token.span()),
        Item::Fn(f) => (&f.vis, signature_span(&f.sig)),
        Item::ForeignMod(m) => return Some(m.abi.extern_token.span()),
        Item::Impl(i) => {
            return Some(
                i.defaultness
                    .map(|t| t.span())
                    .or(i.unsafety.map(|t| t.span()))
                    .unwrap_or_else(|| i.impl_token.span()),
            )
        }
        Item::Macro(m) => return Some(path_span(&m.mac.path)),
        Item::Mod(m) => (
            &m.vis,
            m.unsafety.map(|t| t.span()).unwrap_or_else(|| m.mod_token.span()),
        ),
        Item::Static(s) => (&s.vis, s.static_token.span()),
        Item::Struct(s) => (&s.vis, s.struct_token.span()),
        Item::Trait(t) => (
            &t.vis,
            t.unsafety
                .map(|u| u.span())
                .or(t.auto_token.map(|a| a.span()))
                .unwrap_or_else(|| t.trait_token.span()),
        ),
        Item::TraitAlias(t) => (&t.vis, t.trait_token.span()),
        Item::Type(t) => (&t.vis, t.type_token.span()),
        Item::Union(u) => (&u.vis, u.union_token.span()),
        Item::Use(u) => (&u.vis, u.use_token.span()),
        other => return first_span(other),
    };
    Some(vis_span(vis).unwrap_or(keyword))
}

/// Patterns and expressions start with their leftmost sub-node, so only that chain
/// is followed.
fn pat_span(pat: &Pat) -> Option<Span> {
    let span = match pat {
        Pat::Ident(binding) => binding_span(binding),
        Pat::Lit(lit) => lit.lit.span(),
        Pat::Or(or) => match (&or.leading_vert, or.cases.first()) {
            (Some(vert), _) => vert.span(),
            (None, Some(first)) => return pat_span(first),
            (None, None) => return None,
        },
        Pat::Paren(p) => p.paren_token.span.open(),
        Pat::Path(p) => match &p.qself {
            Some(qself) => qself.lt_token.span(),
            None => path_span(&p.path),
        },
        Pat::Range(r) => match &r.start {
            Some(start) => return expr_span(start),
            None => range_limits_span(&r.limits),
        },
        Pat::Reference(r) => r.and_token.span(),
        Pat::Rest(r) => r.dot2_token.span(),
        Pat::Slice(s) => s.bracket_token.span.open(),
        Pat::Struct(s) => match &s.qself {
            Some(qself) => qself.lt_token.span(),
            None => path_span(&s.path),
        },
        Pat::Tuple(t) => t.paren_token.span.open(),
        Pat::TupleStruct(t) => match &t.qself {
            Some(qself) => qself.lt_token.span(),
            None => path_span(&t.path),
        },
        Pat::Type(t) => return pat_span(&t.pat),
        Pat::Wild(w) => w.underscore_token.span(),
        other => return first_span(other),
    };
    Some(span)
}

fn range_limits_span(limits: &RangeLimits) -> Span {
    match limits {
        RangeLimits::HalfOpen(dots) => dots.span(),
        RangeLimits::Closed(dots) => dots.span(),
    }
}

fn label_or(label: &Option<syn::Label>, keyword: Span) -> Span {
    label.as_ref().map(|l| l.name.span()).unwrap_or(keyword)
}

fn expr_span(expr: &Expr) -> Option<Span> {
    let span = match expr {
        Expr::Array(e) => e.bracket_token.span.open(),
        Expr::Assign(e) => return expr_span(&e.left),
        Expr::Async(e) => e.async_token.span(),
        Expr::Await(e) => return expr_span(&e.base),
        Expr::Binary(e) => return expr_span(&e.left),
        Expr::Block(e) => label_or(&e.label, e.block.brace_token.span.open()),
        Expr::Break(e) => e.break_token.span(),
        Expr::Call(e) => return expr_span(&e.func),
        Expr::Cast(e) => return expr_span(&e.expr),
        Expr::Closure(e) => e
            .lifetimes
            .as_ref()
            .map(|l| l.for_token.span())
            .or(e.constness.map(|t| t.span()))
            .or(e.movability.map(|t| t.span()))
            .or(e.asyncness.map(|t| t.span()))
            .or(e.capture.map(|t| t.span()))
            .unwrap_or_else(|| e.or1_token.span()),
        Expr::Const(e) => e.const_token.span(),
        Expr::Continue(e) => e.continue_token.span(),
        Expr::Field(e) => return expr_span(&e.base),
        Expr::ForLoop(e) => label_or(&e.label, e.for_token.span()),
        Expr::Group(e) => return expr_span(&e.expr),
        Expr::If(e) => e.if_token.span(),
        Expr::Index(e) => return expr_span(&e.expr),
        Expr::Infer(e) => e.underscore_token.span(),
        Expr::Let(e) => e.let_token.span(),
        Expr::Lit(e) => e.lit.span(),
        Expr::Loop(e) => label_or(&e.label, e.loop_token.span()),
        Expr::Macro(e) => path_span(&e.mac.path),
        Expr::Match(e) => e.match_token.span(),
        Expr::MethodCall(e) => return expr_span(&e.receiver),
        Expr::Paren(e) => e.paren_token.span.open(),
        Expr::Path(e) => match &e.qself {
            Some(qself) => qself.lt_token.span(),
            None => path_span(&e.path),
        },
        Expr::Range(e) => match &e.start {
            Some(start) => return expr_span(start),
            None => range_limits_span(&e.limits),
        },
        Expr::Reference(e) => e.and_token.span(),
        Expr::Repeat(e) => e.bracket_token.span.open(),
        Expr::Return(e) => e.return_token.span(),
        Expr::Struct(e) => match &e.qself {
            Some(qself) => qself.lt_token.span(),
            None => path_span(&e.path),
        },
        Expr::Try(e) => return expr_span(&e.expr),
        Expr::TryBlock(e) => e.try_token.span(),
        Expr::Tuple(e) => e.paren_token.span.open(),
        Expr::Unary(e) => match &e.op {
            UnOp::Deref(t) => t.span(),
            UnOp::Not(t) => t.span(),
            UnOp::Neg(t) => t.span(),
            _ => return first_span(expr),
        },
        Expr::Unsafe(e) => e.unsafe_token.span(),
        Expr::While(e) => label_or(&e.label, e.while_token.span()),
        Expr::Yield(e) => e.yield_token.span(),
        other => return first_span(other),
    };
    Some(span)
}

/// Span of the first token that is not part of an outer attribute, for syntax
/// without a fixed leading token (verbatim items, unknown forms).
fn first_span<T: ToTokens + ?Sized>(node: &T) -> Option<Span> {
    let mut tokens = node.to_token_stream().into_iter().peekable();
    loop {
        match tokens.next()? {
            TokenTree::Punct(p) if p.as_char() == '#' => {
                if matches!(tokens.peek(), Some(TokenTree::Punct(bang)) if bang.as_char() == '!') {
                    tokens.next();
                }
                match tokens.next()? {
                    TokenTree::Group(g) if g.delimiter() == Delimiter::Bracket => continue,
                    other => return Some(other.span()),
                }
            }
            other => return Some(other.span()),
        }
    }
}

/// Traits named in `#[derive(..)]` attributes, in source order.
fn derived_traits(attrs: &[Attribute]) -> Vec<syn::Path> {
    let mut traits = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        if let Ok(paths) =
            attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
        {
            traits.extend(paths);
        }
    }
    traits
}

/// Name of a parameter pattern that is a plain identifier (optionally typed).
pub(crate) fn param_ident(pat: &Pat) -> Option<&Ident> {
    match pat {
        Pat::Ident(binding) if binding.subpat.is_none() => Some(&binding.ident),
        Pat::Type(typed) => param_ident(&typed.pat),
        _ => None,
    }
}

/// Identifier patterns starting with an uppercase letter name constants or unit
/// variants (`None`, `MAX`), not fresh bindings.
fn introduces_binding(binding: &PatIdent) -> bool {
    binding.by_ref.is_some()
        || binding.mutability.is_some()
        || binding.subpat.is_some()
        || !binding
            .ident
            .to_string()
            .trim_start_matches("r#")
            .starts_with(|c: char| c.is_uppercase())
}

/// Collects the children of one node, all sharing the same scope.
struct Children<'ast> {
    scope: Rc<Scope>,
    out: Vec<SynNode<'ast>>,
}

impl<'ast> Children<'ast> {
    fn push(&mut self, syn: Syn<'ast>) {
        self.out.push(SynNode {
            syn,
            scope: self.scope.clone(),
        });
    }

    fn of(&mut self, node: Syn<'ast>) {
        match node {
            Syn::Unit(unit) => self.items(&unit.file.items),
            Syn::Item(item) => self.item_body(item),
            Syn::Derived { .. } => {}
            Syn::TraitItem(item) => match item {
                TraitItem::Const(c) => {
                    self.generics(&c.generics);
                    if let Some((_, expr)) = &c.default {
                        self.expr(expr);
                    }
                }
                TraitItem::Fn(f) => {
                    self.signature(&f.sig);
                    if let Some(block) = &f.default {
                        self.block(block);
                    }
                }
                TraitItem::Type(t) => self.generics(&t.generics),
                _ => {}
            },
            Syn::ImplItem(item) => match item {
                ImplItem::Const(c) => {
                    self.generics(&c.generics);
                    self.expr(&c.expr);
                }
                ImplItem::Fn(f) => {
                    self.signature(&f.sig);
                    self.block(&f.block);
                }
                ImplItem::Type(t) => self.generics(&t.generics),
                _ => {}
            },
            Syn::ForeignItem(item) => {
                if let ForeignItem::Fn(f) = item {
                    self.signature(&f.sig);
                }
            }
            Syn::Variant(variant) => {
                self.fields(&variant.fields);
                if let Some((_, expr)) = &variant.discriminant {
                    self.expr(expr);
                }
            }
            Syn::Field { .. } => {}
            Syn::Generic(param) => {
                if let GenericParam::Const(c) = param {
                    if let Some(default) = &c.default {
                        self.expr(default);
                    }
                }
            }
            Syn::Param { arg, .. } => {
                if let FnArg::Typed(typed) = arg {
                    if param_ident(&typed.pat).is_none() {
                        self.bindings(&typed.pat);
                    }
                }
            }
            Syn::ClosureParam { pat, .. } => {
                if param_ident(pat).is_none() {
                    self.bindings(pat);
                }
            }
            Syn::Binding(_) => {}
            Syn::Local(local) => {
                self.bindings(&local.pat);
                if let Some(init) = &local.init {
                    self.expr(&init.expr);
                    if let Some((_, diverge)) = &init.diverge {
                        self.expr(diverge);
                    }
                }
            }
            Syn::Macro(_) => {}
            Syn::Arm(arm) => {
                self.bindings(&arm.pat);
                if let Some((_, guard)) = &arm.guard {
                    self.expr(guard);
                }
                self.expr(&arm.body);
            }
            Syn::Expr(expr) => self.expr_body(expr),
        }
    }

    fn items(&mut self, items: &'ast [Item]) {
        for item in items {
            self.item(item);
        }
    }

    /// An item followed by the impls its derive attributes synthesize.
    fn item(&mut self, item: &'ast Item) {
        self.push(Syn::Item(item));

        let (attrs, target, generics) = match item {
            Item::Struct(s) => (&s.attrs, &s.ident, &s.generics),
            Item::Enum(e) => (&e.attrs, &e.ident, &e.generics),
            Item::Union(u) => (&u.attrs, &u.ident, &u.generics),
            _ => return,
        };
        for trait_path in derived_traits(attrs) {
            self.push(Syn::Derived {
                trait_path: Rc::new(trait_path),
                target,
                generics,
            });
        }
    }

    fn item_body(&mut self, item: &'ast Item) {
        match item {
            Item::Const(c) => {
                self.generics(&c.generics);
                self.expr(&c.expr);
            }
            Item::Enum(e) => {
                self.generics(&e.generics);
                for variant in &e.variants {
                    self.push(Syn::Variant(variant));
                }
            }
            Item::Fn(f) => {
                self.signature(&f.sig);
                self.block(&f.block);
            }
            Item::ForeignMod(m) => {
                for foreign in &m.items {
                    self.push(Syn::ForeignItem(foreign));
                }
            }
            Item::Impl(i) => {
                self.generics(&i.generics);
                for impl_item in &i.items {
                    self.push(Syn::ImplItem(impl_item));
                }
            }
            Item::Mod(m) => {
                if let Some((_, items)) = &m.content {
                    self.items(items);
                }
            }
            Item::Static(s) => self.expr(&s.expr),
            Item::Struct(s) => {
                self.generics(&s.generics);
                self.fields(&s.fields);
            }
            Item::Trait(t) => {
                self.generics(&t.generics);
                for trait_item in &t.items {
                    self.push(Syn::TraitItem(trait_item));
                }
            }
            Item::TraitAlias(t) => self.generics(&t.generics),
            Item::Type(t) => self.generics(&t.generics),
            Item::Union(u) => {
                self.generics(&u.generics);
                for (index, field) in u.fields.named.iter().enumerate() {
                    self.push(Syn::Field { field, index });
                }
            }
            _ => {}
        }
    }

    fn generics(&mut self, generics: &'ast Generics) {
        for param in &generics.params {
            self.push(Syn::Generic(param));
        }
    }

    fn signature(&mut self, sig: &'ast Signature) {
        self.generics(&sig.generics);
        for (index, arg) in sig.inputs.iter().enumerate() {
            self.push(Syn::Param { arg, index });
        }
    }

    fn fields(&mut self, fields: &'ast Fields) {
        for (index, field) in fields.iter().enumerate() {
            self.push(Syn::Field { field, index });
        }
    }

    fn block(&mut self, block: &'ast Block) {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Local(local) => self.push(Syn::Local(local)),
                Stmt::Item(item) => self.item(item),
                Stmt::Expr(expr, _) => self.expr(expr),
                Stmt::Macro(mac) => self.push(Syn::Macro(mac)),
            }
        }
    }

    fn expr(&mut self, expr: &'ast Expr) {
        self.push(Syn::Expr(expr));
    }

    fn opt_expr(&mut self, expr: Option<&'ast Expr>) {
        if let Some(expr) = expr {
            self.expr(expr);
        }
    }

    /// Every name a pattern binds, as `VarDecl` nodes.
    fn bindings(&mut self, pat: &'ast Pat) {
        match pat {
            Pat::Ident(binding) => {
                if introduces_binding(binding) {
                    self.push(Syn::Binding(binding));
                }
                if let Some((_, sub)) = &binding.subpat {
                    self.bindings(sub);
                }
            }
            // Alternatives bind the same names; the first one is representative.
            Pat::Or(or) => {
                if let Some(first) = or.cases.first() {
                    self.bindings(first);
                }
            }
            Pat::Paren(p) => self.bindings(&p.pat),
            Pat::Reference(r) => self.bindings(&r.pat),
            Pat::Slice(s) => s.elems.iter().for_each(|p| self.bindings(p)),
            Pat::Struct(s) => s.fields.iter().for_each(|f| self.bindings(&f.pat)),
            Pat::Tuple(t) => t.elems.iter().for_each(|p| self.bindings(p)),
            Pat::TupleStruct(t) => t.elems.iter().for_each(|p| self.bindings(p)),
            Pat::Type(t) => self.bindings(&t.pat),
            _ => {}
        }
    }

    fn expr_body(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Array(e) => e.elems.iter().for_each(|x| self.expr(x)),
            Expr::Assign(e) => {
                self.expr(&e.left);
                self.expr(&e.right);
            }
            Expr::Async(e) => self.block(&e.block),
            Expr::Await(e) => self.expr(&e.base),
            Expr::Binary(e) => {
                self.expr(&e.left);
                self.expr(&e.right);
            }
            Expr::Block(e) => self.block(&e.block),
            Expr::Break(e) => self.opt_expr(e.expr.as_deref()),
            Expr::Call(e) => {
                self.expr(&e.func);
                e.args.iter().for_each(|x| self.expr(x));
            }
            Expr::Cast(e) => self.expr(&e.expr),
            Expr::Closure(e) => {
                for (index, pat) in e.inputs.iter().enumerate() {
                    self.push(Syn::ClosureParam { pat, index });
                }
                self.expr(&e.body);
            }
            Expr::Const(e) => self.block(&e.block),
            Expr::Field(e) => self.expr(&e.base),
            Expr::ForLoop(e) => {
                self.bindings(&e.pat);
                self.expr(&e.expr);
                self.block(&e.body);
            }
            Expr::Group(e) => self.expr(&e.expr),
            Expr::If(e) => {
                self.expr(&e.cond);
                self.block(&e.then_branch);
                if let Some((_, else_branch)) = &e.else_branch {
                    self.expr(else_branch);
                }
            }
            Expr::Index(e) => {
                self.expr(&e.expr);
                self.expr(&e.index);
            }
            Expr::Let(e) => {
                self.bindings(&e.pat);
                self.expr(&e.expr);
            }
            Expr::Loop(e) => self.block(&e.body),
            Expr::Match(e) => {
                self.expr(&e.expr);
                for arm in &e.arms {
                    self.push(Syn::Arm(arm));
                }
            }
            Expr::MethodCall(e) => {
                self.expr(&e.receiver);
                e.args.iter().for_each(|x| self.expr(x));
            }
            Expr::Paren(e) => self.expr(&e.expr),
            Expr::Range(e) => {
                self.opt_expr(e.start.as_deref());
                self.opt_expr(e.end.as_deref());
            }
            Expr::Reference(e) => self.expr(&e.expr),
            Expr::Repeat(e) => {
                self.expr(&e.expr);
                self.expr(&e.len);
            }
            Expr::Return(e) => self.opt_expr(e.expr.as_deref()),
            Expr::Struct(e) => {
                e.fields.iter().for_each(|f| self.expr(&f.expr));
                self.opt_expr(e.rest.as_deref());
            }
            Expr::Try(e) => self.expr(&e.expr),
            Expr::TryBlock(e) => self.block(&e.block),
            Expr::Tuple(e) => e.elems.iter().for_each(|x| self.expr(x)),
            Expr::Unary(e) => self.expr(&e.expr),
            Expr::Unsafe(e) => self.block(&e.block),
            Expr::While(e) => {
                self.expr(&e.cond);
                self.block(&e.body);
            }
            Expr::Yield(e) => self.opt_expr(e.expr.as_deref()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(source: &str) -> TranslationUnit {
        TranslationUnit::parse(&SourceUnit::new("test.rs", source)).unwrap()
    }

    fn kinds(node: &SynNode<'_>) -> Vec<&'static str> {
        node.children().iter().map(|c| c.kind_name()).collect()
    }

    #[test]
    fn test_function_body_statements_are_direct_children() {
        let tu = unit("fn f(a: i32) -> i32 { let b = a; return b; }");
        let root = tu.root();
        let items = root.children();
        assert_eq!(items.len(), 1);
        assert_eq!(kinds(&items[0]), vec!["ParamDecl", "LetStmt", "ReturnStmt"]);
    }

    #[test]
    fn test_derive_synthesizes_implicit_impls() {
        let tu = unit("#[derive(Debug, Clone)]\nstruct P { x: i32 }\nfn g() {}");
        let items = tu.root().children();
        let shape: Vec<(&str, bool)> = items.iter().map(|n| (n.kind_name(), n.is_implicit())).collect();
        assert_eq!(
            shape,
            vec![
                ("StructDecl", false),
                ("ImplDecl", true),
                ("ImplDecl", true),
                ("FunctionDecl", false),
            ]
        );
        assert_eq!(items[1].begin(), Some(Position::new(1, 10)));
        assert_eq!(items[2].begin(), Some(Position::new(1, 17)));
    }

    #[test]
    fn test_begin_skips_doc_comments() {
        let tu = unit("/// Docs.\n#[inline]\npub fn h() {}\n");
        let items = tu.root().children();
        assert_eq!(items[0].begin(), Some(Position::new(3, 1)));
    }

    #[test]
    fn test_match_arm_bindings_skip_variants() {
        let tu = unit("fn f(o: Option<i32>) { match o { Some(v) => {} None => {} } }");
        let items = tu.root().children();
        let body = items[0].children();
        assert_eq!(body[1].kind_name(), "MatchExpr");
        let arms = body[1].children();
        assert_eq!(kinds(&arms[1]), vec!["VarDecl", "BlockExpr"]);
        assert_eq!(kinds(&arms[2]), vec!["BlockExpr"]);
    }

    #[test]
    fn test_destructuring_param_exposes_bindings() {
        let tu = unit("fn f((a, b): (u8, u8), c: u8) {}");
        let items = tu.root().children();
        let params = items[0].children();
        assert_eq!(kinds(&params[0]), vec!["VarDecl", "VarDecl"]);
        assert!(params[1].children().is_empty());
    }

    #[test]
    fn test_closure_params_are_declarations() {
        let tu = unit("fn f() { let g = |x: u8, y| x + y; }");
        let items = tu.root().children();
        let body = items[0].children();
        let local = body[0].children();
        let closure = &local[1];
        assert_eq!(closure.kind_name(), "ClosureExpr");
        assert_eq!(kinds(closure), vec!["ParamDecl", "ParamDecl", "BinaryExpr"]);
        assert_eq!(closure.children()[0].node_kind(), NodeKind::Declaration);
    }

    /// First token of the node's complete token stream, attributes skipped.
    fn token_stream_begin(node: &Syn<'_>) -> Option<Span> {
        match node {
            Syn::Unit(_) => None,
            Syn::Item(item) => first_span(*item),
            Syn::Derived { trait_path, .. } => first_span(&**trait_path),
            Syn::TraitItem(item) => first_span(*item),
            Syn::ImplItem(item) => first_span(*item),
            Syn::ForeignItem(item) => first_span(*item),
            Syn::Variant(variant) => first_span(*variant),
            Syn::Field { field, .. } => first_span(*field),
            Syn::Generic(param) => first_span(*param),
            Syn::Param { arg, .. } => first_span(*arg),
            Syn::ClosureParam { pat, .. } => first_span(*pat),
            Syn::Binding(binding) => first_span(*binding),
            Syn::Local(local) => first_span(*local),
            Syn::Macro(mac) => first_span(*mac),
            Syn::Arm(arm) => first_span(*arm),
            Syn::Expr(expr) => first_span(*expr),
        }
    }

    #[test]
    fn test_begin_matches_first_token_of_every_node() {
        let source = r#"
/// Docs.
#[derive(Debug)]
pub(crate) struct Wrapper<'a, T, const N: usize>(pub &'a T, [u8; N]);

pub unsafe trait Shape: Sized {
    const SIDES: u32 = 0;
    type Out;
    async fn area(&self) -> f64;
}

impl<'a, T, const N: usize> Wrapper<'a, T, N> {
    pub const fn len(&self) -> usize { N }
    pub(crate) fn inner(&mut self, by: &mut u8) -> Option<u8> {
        let Wrapper(ref first, ..) = *self;
        let [a, b @ .., _] = [1u8, 2, 3];
        let closure = move |x: u8| -> u8 { x * a };
        'outer: for i in 0..=3 {
            println!("{}", i);
            while i < 2 { break 'outer; }
            loop { continue 'outer; }
        }
        match *by {
            | 0 | 1 => None,
            n @ 2..=9 if n % 2 == 0 => Some(-(n as i8) as u8),
            _ => { *by += 1; Some(closure(b[0]).max(!0)) }
        }?;
        let t = (a, [0u8; 4], &mut [1, 2][..], ..3);
        unsafe { std::ptr::null::<u8>().read() };
        <Vec<u8> as Default>::default().len();
        Some(Self::len(self) as u8)
    }
}

extern "C" {
    pub fn ext(x: i32) -> i32;
    static COUNT: u32;
}

macro_rules! twice { ($e:expr) => { $e; $e } }
mod nested { pub use super::Wrapper as W; }
enum Kind { Round = 1, Flat { sides: u8 } }
union Bits { i: u32, f: f32 }
type Alias = u8;
static mut STATE: u8 = 0;
"#;
        let tu = unit(source);
        let mut stack = vec![tu.root()];
        let mut checked = 0;
        while let Some(node) = stack.pop() {
            if !matches!(node.syn, Syn::Unit(_)) {
                let fast = begin_span(&node.syn).map(|s| s.start());
                let full = token_stream_begin(&node.syn).map(|s| s.start());
                assert_eq!(
                    fast.map(|p| (p.line, p.column)),
                    full.map(|p| (p.line, p.column)),
                    "{}",
                    node.kind_name()
                );
                checked += 1;
            }
            stack.extend(node.children());
        }
        assert!(checked > 80, "{}", checked);
    }

    #[test]
    fn test_deep_nesting_keeps_positions() {
        let depth = 100;
        let source = format!("fn f() {{{}0{}}}\n", "{".repeat(depth), "}".repeat(depth));
        let tu = unit(&source);

        let mut node = tu.root().children().remove(0);
        for _ in 0..depth {
            node = node.children().remove(0);
            assert_eq!(node.kind_name(), "BlockExpr");
        }
        let lit = node.children().remove(0);
        assert_eq!(lit.kind_name(), "LitExpr");
        assert_eq!(lit.begin(), Some(Position::new(1, 9 + depth)));
    }
}
