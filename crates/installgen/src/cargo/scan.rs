/// Type enumeration for one crate
///
/// Parses the crate root with `syn` and follows `mod` declarations into
/// their files. The walk records declarations and impls; a second step
/// resolves impls against declarations to decide which types are
/// installers, which have a zero-argument constructor, and which are loader
/// targets.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use proc_macro2::Span;
use syn::{
    Attribute, Expr, Fields, ImplItem, Item, Lit, TraitBoundModifier, Type, TypeParamBound, Visibility, WherePredicate,
};
use crate::config::Settings;
use crate::diagnostic::Location;
use crate::error::{GenerateError, Result};
use crate::model::{Accessibility, LoaderTarget, Namespace, OrderDirective, TypeDecl, TypeShape};
use crate::source::{LoaderScan, StrayDirective};

/// Associated const holding an ordering directive's module list
pub const ORDER_CONST: &str = "MODULES";

/// Bounds every type in a crate can be assumed to meet
const AUTO_TRAITS: &[&str] = &["Send", "Sync", "Sized", "Unpin"];

/// Trait names the scanner matches impls against, by last path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitNames {
    pub installer: String,
    pub loader: String,
    pub order: String,
}

impl Default for TraitNames {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Everything learned from one crate.
#[derive(Debug, Clone, Default)]
pub struct CrateScan {
    pub namespace: Namespace,
    pub loaders: LoaderScan,
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
enum DeclKind {
    Struct { unit: bool },
    Enum { uninhabited: bool },
    Union,
    Trait { supertraits: Vec<String> },
}

#[derive(Debug)]
struct RawDecl {
    module: Vec<String>,
    name: String,
    accessibility: Accessibility,
    kind: DeclKind,
    generic: bool,
    derives_default: bool,
    location: Location,
}

impl RawDecl {
    fn path(&self) -> Vec<String> {
        let mut path = self.module.clone();
        path.push(self.name.clone());
        path
    }
}

#[derive(Debug)]
struct RawImpl {
    trait_name: String,
    /// Self type, resolved against the impl's module
    target: Vec<String>,
    order: Option<OrderDirective>,
    location: Location,
}

/// `impl<T: A + B> Trait for T`
#[derive(Debug)]
struct BlanketImpl {
    trait_name: String,
    bounds: Vec<String>,
}

/// Scan the crate whose root file is `entry`.
pub fn scan_crate(entry: &Path, crate_ident: &str, traits: &TraitNames) -> Result<CrateScan> {
    let mut walker = Walker {
        traits,
        decls: Vec::new(),
        impls: Vec::new(),
        blankets: Vec::new(),
        files: Vec::new(),
    };
    let dir = entry.parent().unwrap_or_else(|| Path::new("."));
    walker.walk_file(entry, &[], true, dir)?;
    Ok(walker.finish(crate_ident))
}

struct Walker<'a> {
    traits: &'a TraitNames,
    decls: Vec<RawDecl>,
    impls: Vec<RawImpl>,
    blankets: Vec<BlanketImpl>,
    files: Vec<PathBuf>,
}

impl Walker<'_> {
    fn walk_file(&mut self, file: &Path, module: &[String], public: bool, dir: &Path) -> Result<()> {
        let source = fs::read_to_string(file).map_err(|e| GenerateError::io(file, e))?;
        let ast = syn::parse_file(&source).map_err(|e| {
            let start = e.span().start();
            GenerateError::parse(file, format!("{} (line {}, column {})", e, start.line, start.column + 1))
        })?;
        self.files.push(file.to_path_buf());
        self.walk_items(&ast.items, file, module, public, dir, false)
    }

    /// `public` is whether every enclosing module is `pub`. `dir` is where
    /// out-of-line child modules of `module` live. `inline` is set inside
    /// `mod name { ... }` blocks.
    fn walk_items(
        &mut self,
        items: &[Item],
        file: &Path,
        module: &[String],
        public: bool,
        dir: &Path,
        inline: bool,
    ) -> Result<()> {
        for item in items {
            match item {
                Item::Struct(s) if !is_test_only(&s.attrs) => {
                    self.declare(file, module, public, &s.vis, &s.attrs, &s.ident, DeclKind::Struct {
                        unit: matches!(s.fields, Fields::Unit),
                    }, !s.generics.params.is_empty());
                }
                Item::Enum(e) if !is_test_only(&e.attrs) => {
                    self.declare(file, module, public, &e.vis, &e.attrs, &e.ident, DeclKind::Enum {
                        uninhabited: e.variants.is_empty(),
                    }, !e.generics.params.is_empty());
                }
                Item::Union(u) if !is_test_only(&u.attrs) => {
                    self.declare(file, module, public, &u.vis, &u.attrs, &u.ident, DeclKind::Union,
                        !u.generics.params.is_empty());
                }
                Item::Trait(t) if !is_test_only(&t.attrs) => {
                    let supertraits = t
                        .supertraits
                        .iter()
                        .filter_map(|bound| match bound {
                            TypeParamBound::Trait(bound) => bound.path.segments.last().map(|s| s.ident.to_string()),
                            _ => None,
                        })
                        .collect();
                    self.declare(file, module, public, &t.vis, &t.attrs, &t.ident, DeclKind::Trait { supertraits },
                        !t.generics.params.is_empty());
                }
                Item::Impl(imp) if !is_test_only(&imp.attrs) => self.record_impl(imp, file, module),
                Item::Mod(m) if !is_test_only(&m.attrs) => {
                    let name = m.ident.to_string();
                    let mut child = module.to_vec();
                    child.push(name.clone());
                    let child_public = public && matches!(m.vis, Visibility::Public(_));

                    match &m.content {
                        Some((_, items)) => {
                            self.walk_items(items, file, &child, child_public, &dir.join(&name), true)?;
                        }
                        None => {
                            let (child_file, child_dir) = module_file(file, dir, inline, &name, &m.attrs)?;
                            self.walk_file(&child_file, &child, child_public, &child_dir)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn declare(
        &mut self,
        file: &Path,
        module: &[String],
        public: bool,
        vis: &Visibility,
        attrs: &[Attribute],
        ident: &syn::Ident,
        kind: DeclKind,
        generic: bool,
    ) {
        self.decls.push(RawDecl {
            module: module.to_vec(),
            name: ident.to_string(),
            accessibility: accessibility(vis, public),
            kind,
            generic,
            derives_default: derives(attrs, "Default"),
            location: location(file, ident.span()),
        });
    }

    fn record_impl(&mut self, imp: &syn::ItemImpl, file: &Path, module: &[String]) {
        let Some((negative, trait_path, _)) = &imp.trait_ else {
            return;
        };
        if negative.is_some() {
            return;
        }
        let Some(trait_segment) = trait_path.segments.last() else {
            return;
        };
        let Type::Path(self_ty) = imp.self_ty.as_ref() else {
            return;
        };
        if self_ty.qself.is_some() {
            return;
        }

        let trait_name = trait_segment.ident.to_string();
        if let Some(bounds) = blanket_bounds(imp, self_ty) {
            if bounds.is_empty() {
                tracing::trace!(trait_name = %trait_name, "unbounded blanket impl ignored");
            } else {
                self.blankets.push(BlanketImpl { trait_name, bounds });
            }
            return;
        }

        let segments: Vec<String> = self_ty.path.segments.iter().map(|s| s.ident.to_string()).collect();
        let order = (trait_name == self.traits.order).then(|| order_directive(&imp.items));

        self.impls.push(RawImpl {
            trait_name,
            target: resolve_path(module, &segments),
            order,
            location: location(file, trait_segment.ident.span()),
        });
    }

    fn finish(self, crate_ident: &str) -> CrateScan {
        let installer_traits = self.installer_traits();
        let index = DeclIndex::new(&self.decls);

        let mut implemented: HashMap<usize, HashSet<&str>> = HashMap::new();
        let mut defaults = HashSet::new();
        let mut loaders: Vec<(usize, &RawImpl)> = Vec::new();
        let mut orders: HashMap<usize, &RawImpl> = HashMap::new();
        let mut stray_orders = Vec::new();

        for imp in &self.impls {
            let Some(decl) = index.lookup(&imp.target) else {
                tracing::trace!(target_path = ?imp.target, trait_name = %imp.trait_name, "impl target not declared in crate");
                if imp.trait_name == self.traits.order {
                    stray_orders.push(imp);
                }
                continue;
            };
            implemented.entry(decl).or_default().insert(imp.trait_name.as_str());
            if imp.trait_name == "Default" {
                defaults.insert(decl);
            }
            if imp.trait_name == self.traits.loader {
                loaders.push((decl, imp));
            }
            if imp.trait_name == self.traits.order {
                orders.entry(decl).or_insert(imp);
            }
        }

        self.apply_blankets(&mut implemented);
        let installers: HashSet<usize> = implemented
            .iter()
            .filter(|(_, traits)| traits.iter().any(|t| installer_traits.contains(t)))
            .map(|(id, _)| *id)
            .collect();

        let mut namespace = Namespace::new(crate_ident);
        for (id, decl) in self.decls.iter().enumerate() {
            let (shape, is_abstract, is_static, implements) = match &decl.kind {
                DeclKind::Struct { unit: true } => (TypeShape::Value, decl.generic, false, installers.contains(&id)),
                DeclKind::Struct { unit: false } | DeclKind::Union => {
                    (TypeShape::Reference, decl.generic, false, installers.contains(&id))
                }
                DeclKind::Enum { uninhabited } => {
                    (TypeShape::Reference, decl.generic, *uninhabited, installers.contains(&id))
                }
                DeclKind::Trait { .. } => {
                    (TypeShape::Reference, true, false, installer_traits.contains(decl.name.as_str()))
                }
            };
            namespace.child_mut(&decl.module).types.push(TypeDecl {
                name: decl.name.clone(),
                accessibility: decl.accessibility,
                shape,
                is_abstract,
                is_static,
                has_default_constructor: decl.derives_default || defaults.contains(&id),
                implements_installer: implements,
                location: Some(decl.location.clone()),
            });
        }

        let loader_ids: HashSet<usize> = loaders.iter().map(|(id, _)| *id).collect();
        let targets = loaders
            .iter()
            .map(|(id, imp)| {
                let decl = &self.decls[*id];
                let module_path = std::iter::once(crate_ident.to_string())
                    .chain(decl.module.iter().cloned())
                    .collect::<Vec<_>>()
                    .join("::");
                LoaderTarget {
                    name: decl.name.clone(),
                    module_path,
                    order: orders
                        .get(id)
                        .and_then(|o| o.order.clone())
                        .unwrap_or_default(),
                    location: Some(imp.location.clone()),
                }
            })
            .collect();

        let mut stray_directives = orders
            .iter()
            .filter(|(id, _)| !loader_ids.contains(*id))
            .map(|(id, imp)| (self.decls[*id].name.clone(), *imp))
            .chain(stray_orders.into_iter().map(|imp| (imp.target.join("::"), imp)))
            .map(|(type_name, imp)| StrayDirective {
                type_name,
                location: Some(imp.location.clone()),
            })
            .collect::<Vec<_>>();
        stray_directives.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        CrateScan {
            namespace,
            loaders: LoaderScan {
                targets,
                stray_directives,
            },
            files: self.files,
        }
    }

    /// Add the traits types gain through blanket impls, until nothing changes
    fn apply_blankets<'s>(&'s self, implemented: &mut HashMap<usize, HashSet<&'s str>>) {
        loop {
            let mut changed = false;
            for blanket in &self.blankets {
                for traits in implemented.values_mut() {
                    if blanket.bounds.iter().all(|b| traits.contains(b.as_str()))
                        && traits.insert(blanket.trait_name.as_str())
                    {
                        changed = true;
                    }
                }
            }
            if !changed {
                return;
            }
        }
    }

    /// The installer trait plus every trait declared here that has it as a
    /// (transitive) supertrait
    fn installer_traits(&self) -> HashSet<&str> {
        let mut traits: HashSet<&str> = HashSet::from([self.traits.installer.as_str()]);
        loop {
            let before = traits.len();
            for decl in &self.decls {
                if let DeclKind::Trait { supertraits } = &decl.kind {
                    if supertraits.iter().any(|s| traits.contains(s.as_str())) {
                        traits.insert(decl.name.as_str());
                    }
                }
            }
            if traits.len() == before {
                return traits;
            }
        }
    }
}

/// Declarations by full path, with a fallback by simple name for impls that
/// name their self type through a `use`
struct DeclIndex {
    by_path: HashMap<Vec<String>, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl DeclIndex {
    fn new(decls: &[RawDecl]) -> Self {
        let mut by_path = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (id, decl) in decls.iter().enumerate() {
            by_path.entry(decl.path()).or_insert(id);
            by_name.entry(decl.name.clone()).or_default().push(id);
        }
        Self { by_path, by_name }
    }

    fn lookup(&self, path: &[String]) -> Option<usize> {
        if let Some(id) = self.by_path.get(path) {
            return Some(*id);
        }
        match self.by_name.get(path.last()?)?.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Resolve a path written inside `module` to a crate-relative path
fn resolve_path(module: &[String], segments: &[String]) -> Vec<String> {
    let mut base = module.to_vec();
    let mut rest = segments;
    match rest.first().map(String::as_str) {
        Some("crate") => {
            base.clear();
            rest = &rest[1..];
        }
        Some("self") => rest = &rest[1..],
        _ => {}
    }
    while rest.first().map(String::as_str) == Some("super") {
        base.pop();
        rest = &rest[1..];
    }
    base.extend(rest.iter().cloned());
    base
}

/// Trait bounds on `T` when `imp` is `impl<T> Trait for T`, from both the
/// parameter list and the where-clause
fn blanket_bounds(imp: &syn::ItemImpl, self_ty: &syn::TypePath) -> Option<Vec<String>> {
    let ident = self_ty.path.get_ident()?;
    let param = imp.generics.type_params().find(|p| p.ident == *ident)?;

    let mut bounds = trait_bounds(&param.bounds);
    for predicate in imp.generics.where_clause.iter().flat_map(|w| &w.predicates) {
        if let WherePredicate::Type(predicate) = predicate {
            if matches!(&predicate.bounded_ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident(ident)) {
                bounds.extend(trait_bounds(&predicate.bounds));
            }
        }
    }
    Some(bounds)
}

fn trait_bounds<'a>(bounds: impl IntoIterator<Item = &'a TypeParamBound>) -> Vec<String> {
    bounds
        .into_iter()
        .filter_map(|bound| match bound {
            TypeParamBound::Trait(t) if matches!(t.modifier, TraitBoundModifier::None) => {
                t.path.segments.last().map(|s| s.ident.to_string())
            }
            _ => None,
        })
        .filter(|name| !AUTO_TRAITS.contains(&name.as_str()))
        .collect()
}

/// Locate the file of `mod name;` declared in `file`
fn module_file(file: &Path, dir: &Path, inline: bool, name: &str, attrs: &[Attribute]) -> Result<(PathBuf, PathBuf)> {
    if let Some(custom) = path_attribute(attrs) {
        let base = if inline {
            dir
        } else {
            file.parent().unwrap_or_else(|| Path::new("."))
        };
        // a file named by #[path] keeps its children beside it, like mod.rs
        let resolved = base.join(custom);
        let child_dir = resolved.parent().unwrap_or(base).to_path_buf();
        return Ok((resolved, child_dir));
    }

    let flat = dir.join(format!("{name}.rs"));
    if flat.is_file() {
        return Ok((flat, dir.join(name)));
    }
    let nested = dir.join(name).join("mod.rs");
    if nested.is_file() {
        return Ok((nested, dir.join(name)));
    }
    Err(GenerateError::ModuleNotFound {
        module: name.to_string(),
        from: file.display().to_string(),
    })
}

fn path_attribute(attrs: &[Attribute]) -> Option<String> {
    attrs.iter().find(|a| a.path().is_ident("path")).and_then(|attr| {
        let value = &attr.meta.require_name_value().ok()?.value;
        match value {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Str(s) => Some(s.value()),
                _ => None,
            },
            _ => None,
        }
    })
}

fn accessibility(vis: &Visibility, enclosing_public: bool) -> Accessibility {
    match vis {
        Visibility::Public(_) if enclosing_public => Accessibility::Public,
        Visibility::Public(_) => Accessibility::Restricted,
        Visibility::Restricted(r) if r.path.is_ident("crate") => Accessibility::Crate,
        Visibility::Restricted(_) => Accessibility::Restricted,
        Visibility::Inherited => Accessibility::Private,
    }
}

fn derives(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().filter(|a| a.path().is_ident("derive")).any(|attr| {
        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.segments.last().is_some_and(|s| s.ident == name) {
                found = true;
            }
            Ok(())
        });
        found
    })
}

/// `#[cfg(test)]` items never exist in the library
fn is_test_only(attrs: &[Attribute]) -> bool {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("cfg"))
        .any(|a| a.parse_args::<syn::Ident>().is_ok_and(|ident| ident == "test"))
}

/// Read the ordering directive's module list from an impl body
fn order_directive(items: &[ImplItem]) -> OrderDirective {
    let Some(constant) = items.iter().find_map(|item| match item {
        ImplItem::Const(c) if c.ident == ORDER_CONST => Some(c),
        _ => None,
    }) else {
        return OrderDirective::Malformed(format!("`{ORDER_CONST}` is not defined"));
    };

    let mut expr = &constant.expr;
    while let Expr::Reference(reference) = expr {
        expr = &reference.expr;
    }
    let Expr::Array(array) = expr else {
        return OrderDirective::Malformed(format!("`{ORDER_CONST}` must be an array of string literals"));
    };

    let mut modules = Vec::with_capacity(array.elems.len());
    for (index, elem) in array.elems.iter().enumerate() {
        match elem {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Str(s) => modules.push(s.value()),
                _ => return OrderDirective::Malformed(format!("entry {index} is not a string literal")),
            },
            _ => return OrderDirective::Malformed(format!("entry {index} is not a string literal")),
        }
    }
    OrderDirective::Declared(modules)
}

fn location(file: &Path, span: Span) -> Location {
    let start = span.start();
    Location::new(file, start.line, start.column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        let module = vec!["a".to_string(), "b".to_string()];
        let seg = |s: &[&str]| s.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert_eq!(resolve_path(&module, &seg(&["X"])), seg(&["a", "b", "X"]));
        assert_eq!(resolve_path(&module, &seg(&["crate", "c", "X"])), seg(&["c", "X"]));
        assert_eq!(resolve_path(&module, &seg(&["super", "X"])), seg(&["a", "X"]));
        assert_eq!(resolve_path(&module, &seg(&["self", "inner", "X"])), seg(&["a", "b", "inner", "X"]));
    }

    #[test]
    fn test_order_directive_forms() {
        let imp: syn::ItemImpl = syn::parse_quote! {
            impl InstallOrder for Loader {
                const MODULES: &'static [&'static str] = &["beta", "alpha"];
            }
        };
        assert_eq!(
            order_directive(&imp.items),
            OrderDirective::Declared(vec!["beta".to_string(), "alpha".to_string()])
        );

        let imp: syn::ItemImpl = syn::parse_quote! {
            impl InstallOrder for Loader {
                const MODULES: &'static [&'static str] = OTHER;
            }
        };
        assert!(matches!(order_directive(&imp.items), OrderDirective::Malformed(_)));

        let imp: syn::ItemImpl = syn::parse_quote! {
            impl InstallOrder for Loader {
                const MODULES: &'static [&'static str] = &["beta", 3];
            }
        };
        assert_eq!(
            order_directive(&imp.items),
            OrderDirective::Malformed("entry 1 is not a string literal".to_string())
        );

        let imp: syn::ItemImpl = syn::parse_quote! { impl InstallOrder for Loader {} };
        assert!(matches!(order_directive(&imp.items), OrderDirective::Malformed(_)));
    }

    #[test]
    fn test_blanket_bounds() {
        let bounds = |imp: syn::ItemImpl| {
            let Type::Path(self_ty) = imp.self_ty.as_ref() else {
                panic!("not a path type");
            };
            blanket_bounds(&imp, self_ty)
        };

        let imp: syn::ItemImpl = syn::parse_quote! {
            impl<T: Module + Send + ?Sized> Installer for T where T: crate::Named {}
        };
        assert_eq!(bounds(imp), Some(vec!["Module".to_string(), "Named".to_string()]));

        let imp: syn::ItemImpl = syn::parse_quote! { impl<T> Installer for Wrapper<T> {} };
        assert_eq!(bounds(imp), None);

        let imp: syn::ItemImpl = syn::parse_quote! { impl Installer for T {} };
        assert_eq!(bounds(imp), None);
    }

    #[test]
    fn test_attribute_helpers() {
        let item: syn::ItemStruct = syn::parse_quote! {
            #[derive(Debug, Default, Clone)]
            #[cfg(test)]
            pub struct S;
        };
        assert!(derives(&item.attrs, "Default"));
        assert!(!derives(&item.attrs, "Hash"));
        assert!(is_test_only(&item.attrs));

        let item: syn::ItemMod = syn::parse_quote! {
            #[path = "other/impls.rs"]
            mod impls;
        };
        assert_eq!(path_attribute(&item.attrs).as_deref(), Some("other/impls.rs"));
    }
}
