use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::ptr;
use std::rc::{Rc, Weak};

use crate::namespaces;
use crate::runtime::value::{Closure, Value};
use crate::syntax::ast::Expr;

/// Name under which each top-level evaluation stores its result.
pub const LAST_RESULT: &str = "$?";

enum Slot {
    Value(Value),
    /// A closure defined in the scope that holds it. It keeps no pointer
    /// back; the owning scope is re-attached on lookup.
    Local { params: Rc<[String]>, body: Rc<Expr> },
}

/// Weak handles to every call frame created under one root.
#[derive(Default)]
struct Frames {
    scopes: RefCell<Vec<Weak<Scope>>>,
    prune_at: Cell<usize>,
}

impl Frames {
    fn track(&self, scope: &Rc<Scope>) {
        let mut scopes = self.scopes.borrow_mut();
        if scopes.len() >= self.prune_at.get() {
            scopes.retain(|s| s.strong_count() > 0);
            self.prune_at.set((scopes.len() * 2).max(64));
        }
        scopes.push(Rc::downgrade(scope));
    }

    fn live(&self) -> Vec<Rc<Scope>> {
        self.scopes.borrow().iter().filter_map(Weak::upgrade).collect()
    }
}

/// One environment in a parent-linked chain. Children hold their parent;
/// parents never hold children.
pub struct Scope {
    bindings: RefCell<HashMap<String, Slot>>,
    parent: Option<Rc<Scope>>,
    frames: Rc<Frames>,
}

impl Scope {
    /// An empty root with no bindings at all.
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
            frames: Rc::new(Frames::default()),
        })
    }

    /// A root seeded with every standard-library binding.
    pub fn global() -> Rc<Scope> {
        let scope = Scope::root();
        for (name, value) in namespaces::standard_bindings() {
            scope.store(name, value);
        }
        scope
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        tracing::trace!(depth = parent.depth() + 1, "enter scope");
        let scope = Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            frames: Rc::clone(&parent.frames),
        });
        parent.frames.track(&scope);
        scope
    }

    /// Create or overwrite `name` in this scope only.
    pub fn store(&self, name: impl Into<String>, value: Value) {
        let slot = match value {
            Value::Closure(c) if ptr::eq(Rc::as_ptr(&c.scope), self) => Slot::Local {
                params: Rc::clone(&c.params),
                body: Rc::clone(&c.body),
            },
            other => Slot::Value(other),
        };
        let replaced = self.bindings.borrow_mut().insert(name.into(), slot);
        drop(replaced);
    }

    /// Walks outward from this scope until `name` is found.
    pub fn resolve(self: &Rc<Self>, name: &str) -> Option<Value> {
        let mut scope = self;
        loop {
            if let Some(slot) = scope.bindings.borrow().get(name) {
                return Some(match slot {
                    Slot::Value(v) => v.clone(),
                    Slot::Local { params, body } => Value::Closure(Rc::new(Closure {
                        params: Rc::clone(params),
                        body: Rc::clone(body),
                        scope: Rc::clone(scope),
                    })),
                });
            }
            scope = scope.parent.as_ref()?;
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Number of ancestors; the root is 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self;
        while let Some(parent) = scope.parent.as_deref() {
            depth += 1;
            scope = parent;
        }
        depth
    }

    /// Sorted names bound directly in this scope.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    // ─── Frame reclamation ───────────────────────────────────────────────────

    /// Drops every binding of a frame nothing outside it can reach.
    pub(crate) fn release(&self) {
        drop(self.bindings.take());
    }

    /// Call frames under this scope's root that are still allocated.
    pub fn live_frames(&self) -> usize {
        self.frames.live().len()
    }

    /// Releases call frames kept alive only by closures stored in each
    /// other's bindings, and returns how many were released.
    ///
    /// A frame survives if something outside the frame graph still holds it
    /// or one of the closures bound in it, or if it is reachable from such a
    /// frame through parent links and bound closures.
    pub fn collect_cycles(&self) -> usize {
        let frames = self.frames.live();
        if frames.is_empty() {
            return 0;
        }
        let index: HashMap<*const Scope, usize> =
            frames.iter().enumerate().map(|(i, s)| (Rc::as_ptr(s), i)).collect();
        let frame_of = |s: &Rc<Scope>| index.get(&Rc::as_ptr(s)).copied();

        // Strong references each frame receives from inside the frame graph.
        let mut internal = vec![0usize; frames.len()];
        // Closures bound in frames: strong count, captured frame, bindings holding it.
        let mut closures: HashMap<*const Closure, (usize, Option<usize>, usize)> = HashMap::new();
        let mut edges: Vec<Vec<*const Closure>> = vec![Vec::new(); frames.len()];

        for (i, frame) in frames.iter().enumerate() {
            if let Some(p) = frame.parent.as_ref().and_then(frame_of) {
                internal[p] += 1;
            }
            for slot in frame.bindings.borrow().values() {
                if let Slot::Value(Value::Closure(c)) = slot {
                    let key = Rc::as_ptr(c);
                    closures.entry(key).or_insert((Rc::strong_count(c), frame_of(&c.scope), 0)).2 += 1;
                    edges[i].push(key);
                }
            }
        }
        for &(_, captured, _) in closures.values() {
            if let Some(f) = captured {
                internal[f] += 1;
            }
        }

        // `frames` itself holds one strong reference to each.
        let mut pending: Vec<usize> = (0..frames.len())
            .filter(|&i| Rc::strong_count(&frames[i]) - 1 > internal[i])
            .collect();
        pending.extend(
            closures
                .values()
                .filter(|&&(strong, _, held)| strong > held)
                .filter_map(|&(_, captured, _)| captured),
        );

        let mut reachable = vec![false; frames.len()];
        while let Some(i) = pending.pop() {
            if std::mem::replace(&mut reachable[i], true) {
                continue;
            }
            if let Some(p) = frames[i].parent.as_ref().and_then(frame_of) {
                pending.push(p);
            }
            pending.extend(edges[i].iter().filter_map(|key| closures[key].1));
        }

        let mut released = 0;
        for (frame, reachable) in frames.iter().zip(reachable) {
            if !reachable {
                frame.release();
                released += 1;
            }
        }
        released
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("names", &self.local_names())
            .field("depth", &self.depth())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
