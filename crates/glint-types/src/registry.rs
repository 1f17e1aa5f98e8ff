//! The Type Registry (§4.2): interns every class/module/`lib` scope,
//! resolves qualified identifiers, and hosts the hierarchy-aware lattice
//! operations (`merge`, `subtype`, `llvm_name`, method mangling) that need
//! to consult the class graph.

use rustc_hash::FxHashMap;

use glint_common::{ClassId, MethodId, NodeId};

use crate::class::{BlockParam, ClassDescriptor, ForeignItem, MethodDef, Param};
use crate::restriction::Restriction;
use crate::ty::{Primitive, Ty};

/// Owns every class/module/`lib` descriptor for one compilation, plus the
/// root scope's constants and the nesting structure needed for qualified
/// name resolution (`Foo::Bar`, leading `::`).
pub struct TypeRegistry {
    classes: Vec<ClassDescriptor>,
    /// Every overload of every method, interned so `MethodId` can index it
    /// directly; `ClassDescriptor::methods` holds only the ids.
    methods: Vec<MethodDef>,
    /// child scope name -> id, keyed by parent scope id. The root scope's
    /// children are keyed under `root`.
    children: FxHashMap<ClassId, FxHashMap<String, ClassId>>,
    parent: FxHashMap<ClassId, ClassId>,
    /// Constants and globals as named type cells, scoped like classes.
    constants: FxHashMap<(ClassId, String), NodeId>,
    root: ClassId,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let root = ClassId(0);
        let mut classes = Vec::new();
        let mut root_desc = ClassDescriptor::new(root, "Object");
        root_desc.is_module = false;
        classes.push(root_desc);
        TypeRegistry {
            classes,
            methods: Vec::new(),
            children: FxHashMap::default(),
            parent: FxHashMap::default(),
            constants: FxHashMap::default(),
            root,
        }
    }

    pub fn root(&self) -> ClassId {
        self.root
    }

    pub fn class(&self, id: ClassId) -> &ClassDescriptor {
        &self.classes[id.0 as usize]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDescriptor {
        &mut self.classes[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.0 as usize]
    }

    /// Intern a new overload of `name` on `owner`, returning its id. Pushed
    /// onto both the global method store and the owning class's dispatch
    /// table.
    #[allow(clippy::too_many_arguments)]
    pub fn define_method(
        &mut self,
        owner: ClassId,
        name: &str,
        params: Vec<Param>,
        block_param: Option<BlockParam>,
        declared_return: Option<Restriction>,
        body: NodeId,
        is_catch_all: bool,
    ) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodDef { id, name: name.to_string(), owner, params, block_param, declared_return, body, is_catch_all });
        self.classes[owner.0 as usize].methods.entry(name.to_string()).or_default().push(id);
        id
    }

    /// Look up every overload of `name` reachable from `class_id`: the
    /// class's own overloads first, then included modules, then the
    /// superclass chain -- matching §4.4's "respecting ancestor chain and
    /// included modules".
    pub fn lookup_methods(&self, class_id: ClassId, name: &str) -> Vec<MethodId> {
        let mut found = Vec::new();
        if let Some(ids) = self.class(class_id).methods.get(name) {
            found.extend(ids.iter().copied());
        }
        for &module in &self.class(class_id).includes.clone() {
            if let Some(ids) = self.class(module).methods.get(name) {
                found.extend(ids.iter().copied());
            }
        }
        if !found.is_empty() {
            return found;
        }
        if let Some(sup) = self.class(class_id).superclass {
            return self.lookup_methods(sup, name);
        }
        Vec::new()
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a class or module nested in `scope`. If `superclass` is
    /// `None` and this is a class (not a module), it implicitly inherits
    /// `Object` (the root), matching a Ruby-style single-root hierarchy --
    /// unless it *is* the root being defined.
    pub fn define_class(
        &mut self,
        scope: ClassId,
        name: &str,
        superclass: Option<ClassId>,
        is_abstract: bool,
        is_module: bool,
    ) -> ClassId {
        if let Some(existing) = self.children.get(&scope).and_then(|m| m.get(name)) {
            // Reopening an existing class/module (`class Foo; ...; end`
            // appearing twice) -- return the same descriptor.
            return *existing;
        }
        let id = ClassId(self.classes.len() as u32);
        let mut desc = ClassDescriptor::new(id, name);
        desc.is_abstract = is_abstract;
        desc.is_module = is_module;
        desc.superclass = if is_module {
            None
        } else {
            superclass.or(if scope == self.root && name == "Object" { None } else { Some(self.root) })
        };
        self.classes.push(desc);
        if let Some(sup) = self.classes[id.0 as usize].superclass {
            self.classes[sup.0 as usize].subclasses.push(id);
        }
        self.children.entry(scope).or_default().insert(name.to_string(), id);
        self.parent.insert(id, scope);
        id
    }

    pub fn define_lib(&mut self, scope: ClassId, name: &str) -> ClassId {
        let id = self.define_class(scope, name, None, false, true);
        self.classes[id.0 as usize].is_lib = true;
        id
    }

    pub fn add_foreign(&mut self, lib_id: ClassId, item: ForeignItem) {
        self.classes[lib_id.0 as usize].foreign.push(item);
    }

    pub fn include_module(&mut self, class_id: ClassId, module_id: ClassId) {
        let includes = &mut self.classes[class_id.0 as usize].includes;
        if !includes.contains(&module_id) {
            includes.push(module_id);
        }
    }

    pub fn define_constant(&mut self, scope: ClassId, name: &str, cell: NodeId) {
        self.constants.insert((scope, name.to_string()), cell);
    }

    pub fn resolve_constant(&self, scope: ClassId, name: &str) -> Option<NodeId> {
        self.constants.get(&(scope, name.to_string())).copied()
    }

    // ── Qualified name resolution (§4.2) ────────────────────────────

    /// Resolve a `::`-separated path against `scope`. A leading `::`
    /// anchors at the root; otherwise resolution walks up the lexical
    /// parent chain from `scope` looking for the first segment, Ruby-style.
    pub fn resolve_path(&self, scope: ClassId, path: &str) -> Option<ClassId> {
        let anchored = path.starts_with("::");
        let trimmed = path.trim_start_matches("::");
        let mut segments = trimmed.split("::");
        let first = segments.next()?;

        let mut current = if anchored {
            self.find_child(self.root, first)?
        } else {
            self.find_in_lexical_scope(scope, first)?
        };
        for seg in segments {
            current = self.find_child(current, seg)?;
        }
        Some(current)
    }

    fn find_child(&self, scope: ClassId, name: &str) -> Option<ClassId> {
        self.children.get(&scope).and_then(|m| m.get(name)).copied()
    }

    fn find_in_lexical_scope(&self, scope: ClassId, name: &str) -> Option<ClassId> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(found) = self.find_child(s, name) {
                return Some(found);
            }
            current = self.parent.get(&s).copied();
        }
        self.find_child(self.root, name)
    }

    /// Resolve a syntactic [`Restriction`] into a concrete [`Ty`], given the
    /// lexical scope and the current `self` type (for `SelfType`).
    pub fn resolve_restriction(&self, scope: ClassId, restriction: &Restriction, self_ty: &Ty) -> Option<Ty> {
        match restriction {
            Restriction::SelfType => Some(self_ty.clone()),
            Restriction::Union(parts) => {
                let resolved: Option<Vec<Ty>> =
                    parts.iter().map(|p| self.resolve_restriction(scope, p, self_ty)).collect();
                Some(Ty::union(resolved?))
            }
            Restriction::Generic(name, args) => {
                let class_id = self.resolve_path(scope, name)?;
                let resolved_args: Option<Vec<Ty>> =
                    args.iter().map(|a| self.resolve_restriction(scope, a, self_ty)).collect();
                let resolved_args = resolved_args?;
                if resolved_args.is_empty() {
                    Some(Ty::Instance(class_id))
                } else {
                    Some(Ty::Generic(class_id, resolved_args))
                }
            }
            Restriction::Path(name) => {
                if let Some(p) = primitive_named(name) {
                    return Some(Ty::Primitive(p));
                }
                self.resolve_path(scope, name).map(Ty::Instance)
            }
        }
    }

    // ── Lattice operations requiring hierarchy knowledge (§4.1) ─────

    /// Least upper bound of a non-empty set of types.
    pub fn merge(&self, types: impl IntoIterator<Item = Ty>) -> Ty {
        // (i) drop duplicates by identity (structural equality == identity here).
        let mut distinct: Vec<Ty> = Vec::new();
        for t in types {
            if !distinct.contains(&t) {
                distinct.push(t);
            }
        }
        // (ii)
        if distinct.len() == 1 {
            return distinct.into_iter().next().unwrap();
        }
        // (iii)
        let classes: Option<Vec<ClassId>> = distinct.iter().map(class_component).collect();
        if let Some(classes) = classes {
            if let Some(common) = self.nearest_common_open_superclass(&classes) {
                return Ty::Hierarchy(common);
            }
        }
        // (iv)
        Ty::union(distinct)
    }

    /// Every class shares `Object` as an ancestor, so stopping short of it
    /// is what keeps merging two *unrelated* classes a `Union` instead of
    /// collapsing to the meaningless `Hierarchy(Object)` (§4.1 rule iii
    /// only makes sense for a shared ancestor with common dispatch surface).
    fn nearest_common_open_superclass(&self, classes: &[ClassId]) -> Option<ClassId> {
        for candidate in self.ancestor_chain(classes[0]) {
            if candidate == self.root {
                continue;
            }
            if classes.iter().all(|c| self.is_subclass_or_eq(*c, candidate)) && self.class(candidate).is_open() {
                return Some(candidate);
            }
        }
        None
    }

    /// `self` and every transitive superclass, nearest first.
    pub fn ancestor_chain(&self, class_id: ClassId) -> Vec<ClassId> {
        let mut chain = vec![class_id];
        let mut current = self.class(class_id).superclass;
        while let Some(c) = current {
            chain.push(c);
            current = self.class(c).superclass;
        }
        chain
    }

    pub fn is_subclass_or_eq(&self, a: ClassId, b: ClassId) -> bool {
        a == b || self.ancestor_chain(a).contains(&b)
    }

    /// Structural subtyping, per §4.1.
    pub fn subtype(&self, a: &Ty, b: &Ty) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (Ty::Union(members), _) => members.iter().all(|m| self.subtype(m, b)),
            (_, Ty::Union(members)) => members.iter().any(|m| self.subtype(a, m)),
            (Ty::Hierarchy(c1), Ty::Hierarchy(c2)) => self.is_subclass_or_eq(*c1, *c2),
            (Ty::Hierarchy(c1), Ty::Instance(c2)) => self.is_subclass_or_eq(*c1, *c2),
            (Ty::Instance(c1), Ty::Hierarchy(c2)) => self.is_subclass_or_eq(*c1, *c2),
            (Ty::Instance(c1), Ty::Instance(c2)) => self.is_subclass_or_eq(*c1, *c2),
            (Ty::Generic(c1, a1), Ty::Generic(c2, a2)) => c1 == c2 && a1 == a2,
            _ => false,
        }
    }

    /// Stable mangled identifier for a type, used by the (external) code
    /// generator and by method mangling below.
    pub fn llvm_name(&self, ty: &Ty) -> String {
        match ty {
            Ty::Primitive(p) => p.name().to_string(),
            Ty::Instance(c) => self.class(*c).name.clone(),
            Ty::Generic(c, args) => {
                let arg_names: Vec<String> = args.iter().map(|a| self.llvm_name(a)).collect();
                format!("{}<{}>", self.class(*c).name, arg_names.join(","))
            }
            Ty::Union(members) => {
                let mut names: Vec<String> = members.iter().map(|m| self.llvm_name(m)).collect();
                names.sort();
                format!("Union[{}]", names.join("|"))
            }
            Ty::Hierarchy(c) => format!("{}+", self.class(*c).name),
            Ty::Metaclass(c) => format!("{}.class", self.class(*c).name),
        }
    }

    /// Deterministic mangled name for a call's resolved target, per §4.5:
    /// owner type, method name (`@` rewritten to `.`), argument-type tuple,
    /// and return type.
    pub fn mangle_method(&self, owner: &Ty, method_name: &str, args: &[Ty], ret: &Ty) -> String {
        let name = method_name.replace('@', ".");
        let arg_part: Vec<String> = args.iter().map(|a| self.llvm_name(a)).collect();
        format!("{}#{}({})->{}", self.llvm_name(owner), name, arg_part.join(","), self.llvm_name(ret))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn class_component(ty: &Ty) -> Option<ClassId> {
    match ty {
        Ty::Instance(c) | Ty::Generic(c, _) | Ty::Hierarchy(c) => Some(*c),
        _ => None,
    }
}

fn primitive_named(name: &str) -> Option<Primitive> {
    Some(match name {
        "Nil" => Primitive::Nil,
        "Bool" => Primitive::Bool,
        "Char" => Primitive::Char,
        "Int8" => Primitive::Int8,
        "Int16" => Primitive::Int16,
        "Int32" => Primitive::Int32,
        "Int64" => Primitive::Int64,
        "Float32" => Primitive::Float32,
        "Float64" => Primitive::Float64,
        "String" => Primitive::String,
        "Symbol" => Primitive::Symbol,
        "Void" => Primitive::Void,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_single_type_is_identity() {
        let registry = TypeRegistry::new();
        let ty = Ty::Primitive(Primitive::Int32);
        assert_eq!(registry.merge(vec![ty.clone(), ty.clone()]), ty);
    }

    #[test]
    fn merge_unrelated_types_is_union() {
        let registry = TypeRegistry::new();
        let merged = registry.merge(vec![Ty::Primitive(Primitive::Int32), Ty::Primitive(Primitive::Char)]);
        assert!(matches!(merged, Ty::Union(_)));
    }

    #[test]
    fn merge_open_siblings_collapses_to_hierarchy() {
        let mut registry = TypeRegistry::new();
        let root = registry.root();
        let foo = registry.define_class(root, "Foo", None, false, false);
        let bar = registry.define_class(root, "Bar", Some(foo), false, false);
        let baz = registry.define_class(root, "Baz", Some(foo), false, false);
        let merged = registry.merge(vec![Ty::Instance(bar), Ty::Instance(baz)]);
        assert_eq!(merged, Ty::Hierarchy(foo));
    }

    #[test]
    fn merge_with_no_shared_open_ancestor_is_union() {
        let mut registry = TypeRegistry::new();
        let root = registry.root();
        let foo = registry.define_class(root, "Foo", None, false, false);
        let quux = registry.define_class(root, "Quux", None, false, false);
        let merged = registry.merge(vec![Ty::Instance(foo), Ty::Instance(quux)]);
        assert!(matches!(merged, Ty::Union(_)));
    }

    #[test]
    fn subtype_transitive() {
        let mut registry = TypeRegistry::new();
        let root = registry.root();
        let a = registry.define_class(root, "A", None, false, false);
        let b = registry.define_class(root, "B", Some(a), false, false);
        let c = registry.define_class(root, "C", Some(b), false, false);
        assert!(registry.subtype(&Ty::Instance(c), &Ty::Instance(a)));
        assert!(!registry.subtype(&Ty::Instance(a), &Ty::Instance(c)));
    }

    #[test]
    fn resolve_qualified_path() {
        let mut registry = TypeRegistry::new();
        let root = registry.root();
        let geo = registry.define_class(root, "Geometry", None, false, true);
        let point = registry.define_class(geo, "Point", None, false, false);
        assert_eq!(registry.resolve_path(root, "Geometry::Point"), Some(point));
        assert_eq!(registry.resolve_path(root, "::Geometry::Point"), Some(point));
    }
}
