//! trybuild 编译测试

#[test]
fn trybuild_di_macros() {
    let t = trybuild::TestCases::new();
    t.pass("tests/trybuild/params_ok.rs");
    t.pass("tests/trybuild/results_ok.rs");
}
