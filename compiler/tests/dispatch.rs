//! End-to-end tests driving `Session` from a hand-built expression arena through to a
//! `CompiledDefinition`, exercising the full C3 -> C4 -> C5 -> dispatch pipeline the way a
//! driver embedding this crate would.

use fsc_compiler::{
    ActionSet, CompiledDefinition, CompileError, Definition, ExprArena, ExprKind, Loc, Session, SessionConfig, DEAD,
};

fn compile_single(arena: ExprArena, root: usize, name: &str) -> CompiledDefinition {
    let mut session = Session::new(arena, SessionConfig::default());
    let def = Definition { name: name.to_string(), root, export: true, intact: false, export_params: String::new() };
    session.add_definition(0, def);
    let failures = session.compile_all();
    assert!(failures.is_empty(), "unexpected compile failures: {:?}", failures);
    let fsa = session.compile_export(0, false);
    let table = session.compile_actions(&fsa);
    CompiledDefinition::new(table)
}

/// A tiny deterministic xorshift generator, seeded from a fixed constant so the property test
/// below is reproducible across runs without pulling in a dependency the rest of the workspace
/// doesn't use.
struct Xorshift(u64);

impl Xorshift {
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn next_byte(&mut self, alphabet: &[u8]) -> u8 {
        alphabet[(self.next_u64() as usize) % alphabet.len()]
    }
}

/// A backtracking reference matcher over the same expression tree the Thompson builder consumes,
/// used as the "naive simulator" the compiled `transit` table is checked against.
fn naive_matches(arena: &ExprArena, id: usize, input: &[u8]) -> bool {
    fn go(arena: &ExprArena, id: usize, input: &[u8], pos: usize, k: &mut dyn FnMut(usize) -> bool) -> bool {
        match arena.kind(id).clone() {
            ExprKind::Literal(bytes) => {
                if input[pos..].starts_with(&bytes[..]) {
                    k(pos + bytes.len())
                } else {
                    false
                }
            }
            ExprKind::Epsilon => k(pos),
            ExprKind::Concat(l, r) => go(arena, l, input, pos, &mut |mid| go(arena, r, input, mid, k)),
            ExprKind::Union(l, r) => go(arena, l, input, pos, k) || go(arena, r, input, pos, k),
            ExprKind::Question(e) => go(arena, e, input, pos, k) || k(pos),
            ExprKind::Star(e) => {
                if k(pos) {
                    return true;
                }
                go(arena, e, input, pos, &mut |mid| mid > pos && go(arena, id, input, mid, k))
            }
            ExprKind::Plus(e) => go(arena, e, input, pos, &mut |mid| {
                k(mid) || (mid > pos && go(arena, id, input, mid, k))
            }),
            other => panic!("naive_matches: unsupported node for this property test: {:?}", other),
        }
    }
    go(arena, id, input, 0, &mut |end| end == input.len())
}

/// `("cat" "dog"*)?`, built by hand in the same shape the parser would produce, used as the
/// grammar exercised by the `transit`-vs-naive-simulator property test below.
fn property_grammar() -> (ExprArena, usize) {
    let mut arena = ExprArena::new();
    let cat = arena.push(ExprKind::Literal(b"cat".to_vec()), Loc::default(), ActionSet::default(), 0);
    let dog = arena.push(ExprKind::Literal(b"dog".to_vec()), Loc::default(), ActionSet::default(), 0);
    let dogs = arena.push(ExprKind::Star(dog), Loc::default(), ActionSet::default(), 0);
    let body = arena.push(ExprKind::Concat(cat, dogs), Loc::default(), ActionSet::default(), 0);
    let root = arena.push(ExprKind::Question(body), Loc::default(), ActionSet::default(), 0);
    (arena, root)
}

/// Runs `input` through a compiled definition's `transit` from its start state, returning whether
/// it lands on a final state (`DEAD` along the way means reject).
fn compiled_accepts(compiled: &CompiledDefinition, input: &[u8]) -> bool {
    let mut state = compiled.start();
    for &b in input {
        state = compiled.transit(state, b as i64, |_| {});
        if state == DEAD {
            return false;
        }
    }
    compiled.is_final(state)
}

/// `export main = "ab"` with an entering action on the root literal and a finishing action on
/// it: the literal's three states (start, middle, final) all share one expression id, so the
/// first transition must register as `entering` (the id is absent at the source state, the
/// `start`-only tag there does not count as "within") and the second as `transiting` +
/// `finishing` (the id is present at both ends, finishing because the target is final).
#[test]
fn literal_two_byte_fires_entering_then_finishing() {
    let mut arena = ExprArena::new();
    let actions = ActionSet { entering: vec![10], leaving: vec![], transiting: vec![], finishing: vec![20] };
    let root = arena.push(ExprKind::Literal(b"ab".to_vec()), Loc::default(), actions, 0);

    let compiled = compile_single(arena, root, "main");
    let s0 = compiled.start();
    assert!(!compiled.is_final(s0));

    let mut fired = Vec::new();
    let s1 = compiled.transit(s0, b'a' as i64, |a| fired.push(a));
    assert_ne!(s1, DEAD);
    assert_eq!(fired, vec![10]);
    assert!(!compiled.is_final(s1));

    fired.clear();
    let s2 = compiled.transit(s1, b'b' as i64, |a| fired.push(a));
    assert_ne!(s2, DEAD);
    assert_eq!(fired, vec![20]);
    assert!(compiled.is_final(s2));

    // wrong byte at either step is dead.
    assert_eq!(compiled.transit(s0, b'x' as i64, |_| {}), DEAD);
    assert_eq!(compiled.transit(s1, b'x' as i64, |_| {}), DEAD);
}

/// `export main = "cat" | "dog"`: minimization must not merge the two branches (they accept
/// disjoint languages), and each one's literal bytes must still drive to a final state.
#[test]
fn union_of_two_literals_accepts_either_branch() {
    let mut arena = ExprArena::new();
    let cat = arena.push(ExprKind::Literal(b"cat".to_vec()), Loc::default(), ActionSet::default(), 0);
    let dog = arena.push(ExprKind::Literal(b"dog".to_vec()), Loc::default(), ActionSet::default(), 0);
    let root = arena.push(ExprKind::Union(cat, dog), Loc::default(), ActionSet::default(), 0);

    let compiled = compile_single(arena, root, "main");

    for word in [&b"cat"[..], &b"dog"[..]] {
        let mut state = compiled.start();
        for &b in word {
            state = compiled.transit(state, b as i64, |_| {});
            assert_ne!(state, DEAD, "word {:?} unexpectedly dead", word);
        }
        assert!(compiled.is_final(state), "word {:?} did not land on a final state", word);
    }

    // "cow" shares a prefix with neither branch past the first byte and must die.
    let mut state = compiled.start();
    state = compiled.transit(state, b'c' as i64, |_| {});
    assert_ne!(state, DEAD);
    state = compiled.transit(state, b'o' as i64, |_| {});
    assert_eq!(state, DEAD);
}

/// `export main = "a"*`: zero, one, and many repetitions must all land on a final state, and
/// every repetition after the first is indistinguishable by symbol from the first (minimization
/// collapses the loop to a single state).
#[test]
fn star_accepts_zero_or_more_repetitions() {
    let mut arena = ExprArena::new();
    let a = arena.push(ExprKind::Literal(b"a".to_vec()), Loc::default(), ActionSet::default(), 0);
    let root = arena.push(ExprKind::Star(a), Loc::default(), ActionSet::default(), 0);

    let compiled = compile_single(arena, root, "main");
    assert!(compiled.is_final(compiled.start()));

    let mut state = compiled.start();
    for _ in 0..5 {
        state = compiled.transit(state, b'a' as i64, |_| {});
        assert_ne!(state, DEAD);
        assert!(compiled.is_final(state));
    }
    assert_eq!(compiled.transit(state, b'b' as i64, |_| {}), DEAD);
}

/// Embedding inlines the embedded definition's automaton at compile time: a definition that
/// embeds another reachable only via `Embed` must still compile, and accept the embedded
/// definition's language as its own.
#[test]
fn embed_inlines_referenced_definition() {
    let mut arena = ExprArena::new();
    let inner_lit = arena.push(ExprKind::Literal(b"x".to_vec()), Loc::default(), ActionSet::default(), 1);
    let outer_embed = arena.push(ExprKind::Embed(1), Loc::default(), ActionSet::default(), 0);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(1, Definition {
        name: "inner".to_string(),
        root: inner_lit,
        export: false,
        intact: false,
        export_params: String::new(),
    });
    session.add_definition(0, Definition {
        name: "outer".to_string(),
        root: outer_embed,
        export: true,
        intact: false,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert!(failures.is_empty(), "unexpected compile failures: {:?}", failures);
    let fsa = session.compile_export(0, false);
    let table = session.compile_actions(&fsa);
    let compiled = CompiledDefinition::new(table);

    let s1 = compiled.transit(compiled.start(), b'x' as i64, |_| {});
    assert_ne!(s1, DEAD);
    assert!(compiled.is_final(s1));
}

/// A two-definition `Embed` cycle must be reported as `CyclicEmbed`, not silently mis-ordered or
/// stack-overflowed.
#[test]
fn cyclic_embed_is_reported_as_an_error() {
    let mut arena = ExprArena::new();
    // Node ids are assigned before either definition's root is known, so wire the embeds up
    // after both literal placeholders exist.
    let embed_of_b = arena.push(ExprKind::Embed(1), Loc::default(), ActionSet::default(), 0);
    let embed_of_a = arena.push(ExprKind::Embed(0), Loc::default(), ActionSet::default(), 1);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(0, Definition {
        name: "a".to_string(),
        root: embed_of_b,
        export: false,
        intact: false,
        export_params: String::new(),
    });
    session.add_definition(1, Definition {
        name: "b".to_string(),
        root: embed_of_a,
        export: false,
        intact: false,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert_eq!(failures.len(), 1);
    match &failures[0].1 {
        CompileError::CyclicEmbed(chain) => {
            assert!(chain.contains(&"a".to_string()));
            assert!(chain.contains(&"b".to_string()));
        }
        other => panic!("expected CyclicEmbed, got {:?}", other),
    }
}

/// `repeat(lit, 3, 1)` (low > high) must be rejected by C3 before any automaton is built.
#[test]
fn invalid_repeat_bound_is_rejected() {
    let mut arena = ExprArena::new();
    let lit = arena.push(ExprKind::Literal(b"a".to_vec()), Loc::default(), ActionSet::default(), 0);
    let root = arena.push(ExprKind::Repeat(lit, 3, Some(1)), Loc::default(), ActionSet::default(), 0);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(0, Definition {
        name: "main".to_string(),
        root,
        export: true,
        intact: false,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert_eq!(failures.len(), 1);
    match &failures[0].1 {
        CompileError::InvalidRepeat { low, high, .. } => {
            assert_eq!(*low, 3);
            assert_eq!(*high, 1);
        }
        other => panic!("expected InvalidRepeat, got {:?}", other),
    }
}

/// Referencing an absent definition (neither a registered `Collapse` target nor `Embed` target)
/// surfaces `UndefinedReference` rather than panicking.
#[test]
fn embed_of_undefined_definition_is_reported() {
    let mut arena = ExprArena::new();
    let root = arena.push(ExprKind::Embed(99), Loc::default(), ActionSet::default(), 0);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(0, Definition {
        name: "main".to_string(),
        root,
        export: true,
        intact: false,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].1, CompileError::UndefinedReference(99)));
}

/// `collapse`ing into another definition splices that definition's automaton in at export time
/// (unlike `embed`, which inlines at compile time) — a root whose only content is a `Collapse`
/// must still compile and accept the target's language.
#[test]
fn collapse_links_referenced_definition_at_export_time() {
    let mut arena = ExprArena::new();
    let target_lit = arena.push(ExprKind::Literal(b"cat".to_vec()), Loc::default(), ActionSet::default(), 1);
    let root = arena.push(ExprKind::Collapse(1), Loc::default(), ActionSet::default(), 0);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(1, Definition {
        name: "target".to_string(),
        root: target_lit,
        export: false,
        intact: false,
        export_params: String::new(),
    });
    session.add_definition(0, Definition {
        name: "root".to_string(),
        root,
        export: true,
        intact: false,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert!(failures.is_empty(), "unexpected compile failures: {:?}", failures);
    let fsa = session.compile_export(0, false);
    let table = session.compile_actions(&fsa);
    let compiled = CompiledDefinition::new(table);

    assert!(compiled_accepts(&compiled, b"cat"));
    assert!(!compiled_accepts(&compiled, b"dog"));
}

/// With `substring: true`, `compile_export` wraps the composite so any contiguous substring of a
/// full parse is itself accepted, except through a region whose owning definition is `intact`.
#[test]
fn substring_export_permits_interior_cuts_unless_intact() {
    let mut arena = ExprArena::new();
    let root = arena.push(ExprKind::Literal(b"abc".to_vec()), Loc::default(), ActionSet::default(), 0);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(0, Definition {
        name: "main".to_string(),
        root,
        export: true,
        intact: false,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert!(failures.is_empty(), "unexpected compile failures: {:?}", failures);
    let fsa = session.compile_export(0, true);
    let table = session.compile_actions(&fsa);
    let compiled = CompiledDefinition::new(table);

    assert!(compiled_accepts(&compiled, b"abc"));
    assert!(compiled_accepts(&compiled, b"b"));
    assert!(compiled_accepts(&compiled, b"ab"));
    assert!(compiled_accepts(&compiled, b"bc"));
}

/// Marking the definition `intact` blocks every interior cut through it: only the whole parse
/// (or nothing) survives the substring rewrite.
#[test]
fn substring_export_blocks_interior_cuts_when_intact() {
    let mut arena = ExprArena::new();
    let root = arena.push(ExprKind::Literal(b"abc".to_vec()), Loc::default(), ActionSet::default(), 0);

    let mut session = Session::new(arena, SessionConfig::default());
    session.add_definition(0, Definition {
        name: "main".to_string(),
        root,
        export: true,
        intact: true,
        export_params: String::new(),
    });

    let failures = session.compile_all();
    assert!(failures.is_empty(), "unexpected compile failures: {:?}", failures);
    let fsa = session.compile_export(0, true);
    let table = session.compile_actions(&fsa);
    let compiled = CompiledDefinition::new(table);

    assert!(compiled_accepts(&compiled, b"abc"));
    assert!(!compiled_accepts(&compiled, b"b"));
    assert!(!compiled_accepts(&compiled, b"ab"));
}

/// `("a" | "b" | "c") - "b"` exercised through the full `Session` pipeline: difference at the
/// compiler boundary, not just the `automata`-crate unit level.
#[test]
fn difference_excludes_one_branch_through_the_compiler() {
    let mut arena = ExprArena::new();
    let abc = arena.push(ExprKind::Bracket(vec![(b'a' as i64, b'c' as i64 + 1)]), Loc::default(), ActionSet::default(), 0);
    let b = arena.push(ExprKind::Literal(b"b".to_vec()), Loc::default(), ActionSet::default(), 0);
    let root = arena.push(ExprKind::Difference(abc, b), Loc::default(), ActionSet::default(), 0);

    let compiled = compile_single(arena, root, "main");

    assert!(compiled_accepts(&compiled, b"a"));
    assert!(compiled_accepts(&compiled, b"c"));
    assert!(!compiled_accepts(&compiled, b"b"));
    assert!(!compiled_accepts(&compiled, b"d"));
}

/// `Complement("a")` over the default 256-symbol alphabet: every string except the one-byte
/// literal "a" is accepted, including the empty string.
#[test]
fn complement_accepts_everything_but_the_literal() {
    let mut arena = ExprArena::new();
    let a = arena.push(ExprKind::Literal(b"a".to_vec()), Loc::default(), ActionSet::default(), 0);
    let root = arena.push(ExprKind::Complement(a), Loc::default(), ActionSet::default(), 0);

    let compiled = compile_single(arena, root, "main");

    assert!(compiled_accepts(&compiled, b""));
    assert!(compiled_accepts(&compiled, b"b"));
    assert!(compiled_accepts(&compiled, b"aa"));
    assert!(!compiled_accepts(&compiled, b"a"));
}

/// Regression for the action-label anti-merge defect: `("a" @x) | ("b" @x)` puts the same entering
/// action on both union branches. Before the fix, `compile_one`'s per-definition `trim()` deleted
/// the anchor edge ahead of the composite's own (real) minimize, leaving that minimize unprotected
/// so it could merge the two branches' start states — and since they're already bisimilar on
/// structure alone except for the (now-missing) anchor, the merge silently went undetected by
/// tests that never checked actions fired from *both* branches.
#[test]
fn action_anchor_survives_minimization_on_both_union_branches() {
    let mut arena = ExprArena::new();
    let actions = ActionSet { entering: vec![7], leaving: vec![], transiting: vec![], finishing: vec![] };
    let a = arena.push(ExprKind::Literal(b"a".to_vec()), Loc::default(), actions.clone(), 0);
    let b = arena.push(ExprKind::Literal(b"b".to_vec()), Loc::default(), actions, 0);
    let root = arena.push(ExprKind::Union(a, b), Loc::default(), ActionSet::default(), 0);

    let compiled = compile_single(arena, root, "main");

    let mut fired_a = Vec::new();
    let sa = compiled.transit(compiled.start(), b'a' as i64, |act| fired_a.push(act));
    assert_ne!(sa, DEAD);
    assert_eq!(fired_a, vec![7], "action on the 'a' branch must still fire after minimization");

    let mut fired_b = Vec::new();
    let sb = compiled.transit(compiled.start(), b'b' as i64, |act| fired_b.push(act));
    assert_ne!(sb, DEAD);
    assert_eq!(fired_b, vec![7], "action on the 'b' branch must still fire after minimization");
}

/// Compiled `transit` must agree with a naive backtracking simulator over the same expression
/// tree across many pseudo-randomly generated inputs, for a grammar mixing concatenation, union,
/// star, and optionality.
#[test]
fn transit_agrees_with_naive_simulator_on_random_inputs() {
    let (arena, root) = property_grammar();
    let compiled = compile_single(arena.clone(), root, "main");

    let alphabet = [b'c', b'a', b't', b'd', b'o', b'g', b'x'];
    let mut rng = Xorshift(0x5eed_1234_cafe_babe);
    for _ in 0..10_000 {
        let len = (rng.next_u64() % 7) as usize;
        let input: Vec<u8> = (0..len).map(|_| rng.next_byte(&alphabet)).collect();
        let expected = naive_matches(&arena, root, &input);
        let actual = compiled_accepts(&compiled, &input);
        assert_eq!(actual, expected, "mismatch on input {:?}", input);
    }
}
