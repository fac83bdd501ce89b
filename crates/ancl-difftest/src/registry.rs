use ancl_harness::TestCase;

/// Conformance programs, in execution order, relative to the tests dir.
///
/// Adding a program only requires appending its path here.
const TEST_CASES: &[TestCase] = &[
    // basic: return values and arithmetic
    TestCase::new("basic/answer.c"),
    // call: calling convention, including variadic calls
    TestCase::new("call/variadic_hello.c"),
    TestCase::new("call/long_answer.c"),
    // loop: control flow
    TestCase::new("loop/count.c"),
    TestCase::new("loop/fib.c"),
    TestCase::new("loop/nested.c"),
    TestCase::new("loop/goto.c"),
    // struct: aggregate layout and member access
    TestCase::new("struct/readwrite.c"),
    TestCase::new("struct/union.c"),
    TestCase::new("alignment/basic.c"),
    // hard: recursion and heap data structures
    TestCase::new("hard/bintree.c"),
    TestCase::new("hard/avl.c"),
];

pub fn cases() -> impl Iterator<Item = TestCase> + Clone {
    TEST_CASES.iter().copied()
}

/// Registry order is preserved; `exact` matches whole identifiers only.
pub fn select(filter: Option<&str>, exact: bool) -> impl Iterator<Item = TestCase> + Clone + '_ {
    cases().filter(move |case| match filter {
        None => true,
        Some(f) if exact => case.id() == f,
        Some(f) => case.id().contains(f),
    })
}
