//! 判定ごとの典型的なシナリオ

use super::*;
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

#[test]
fn test_correct_result() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("add.0.mod", "exit 0");

    let (lines, summary) = fx.run();
    assert!(fx
        .line_for(&lines, "add.0.mod")
        .ends_with("test OK (correct result), got 0"));
    assert_eq!(summary, RunSummary { passed: 1, failed: 0 });
}

#[test]
fn test_wrong_result() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("sub.5.mod", "exit 3");

    let (lines, summary) = fx.run();
    assert!(fx
        .line_for(&lines, "sub.5.mod")
        .ends_with("test FAILED (wrong result), got 3 wanted 5"));
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_exit_code_ignored_without_expectation() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("loop.mod", "exit 17");

    let (lines, _) = fx.run();
    assert!(fx
        .line_for(&lines, "loop.mod")
        .ends_with("test OK (compiled and ran ok)"));
}

#[test]
fn test_compiler_error_includes_diagnostic() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("broken.mod", "SYNTAX (");

    let (lines, _) = fx.run();
    let line = fx.line_for(&lines, "broken.mod");
    assert!(line.contains("FAILED (compiler error)"), "{}", line);
    assert!(line.contains("error: unexpected token near SYNTAX"), "{}", line);
}

#[test]
fn test_assemble_error_includes_both_streams() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("asm.0.mod", "# BADASM\nexit 0");

    let (lines, _) = fx.run();
    let line = fx.line_for(&lines, "asm.0.mod");
    assert!(line.contains("FAILED (assemble error)"), "{}", line);
    assert!(line.contains("asm: line 2: bad instruction"), "{}", line);
    assert!(line.contains("asm: giving up"), "{}", line);
}

#[test]
fn test_linker_error() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("link.0.mod", "# MALFORMED\nexit 0");

    let (lines, _) = fx.run();
    let line = fx.line_for(&lines, "link.0.mod");
    assert!(line.contains("FAILED (linker error)"), "{}", line);
    assert!(line.contains("file format not recognized"), "{}", line);
}

#[test]
fn test_non_executable_output_is_bad_binary() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("perm.0.mod", "# NOEXEC\nexit 0");

    let (lines, _) = fx.run();
    assert!(fx
        .line_for(&lines, "perm.0.mod")
        .ends_with("test FAILED (bad binary)"));
}

#[test]
fn test_signal_is_bad_binary() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("crash.mod", "kill -9 $$");

    let (lines, _) = fx.run();
    assert!(fx
        .line_for(&lines, "crash.mod")
        .ends_with("test FAILED (bad binary)"));
}

#[test]
fn test_missing_compiler_fails_every_test() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("a.0.mod", "exit 0");
    fx.add_test("b.mod", "exit 0");

    let mut config = fx.config();
    config.toolchain.compiler = fx.tools.join("no-such-compiler");
    let (lines, summary) = fx.run_with(config);

    assert_eq!(summary, RunSummary { passed: 0, failed: 2 });
    assert!(lines.iter().all(|l| l.contains("FAILED (compiler error)")));
}

#[test]
fn test_timeout_kills_hung_binary() {
    let _guard = serial();
    let fx = Fixture::new();
    // exec しないので、sh の子として sleep が残る
    fx.add_test("hang.0.mod", "sleep 30\ntrue");

    let mut config = fx.config();
    config.timeout_secs = Some(1);
    let start = Instant::now();
    let (lines, _) = fx.run_with(config);

    assert!(start.elapsed() < Duration::from_secs(4), "took {:?}", start.elapsed());
    assert!(fx
        .line_for(&lines, "hang.0.mod")
        .ends_with("test FAILED (timed out in execute)"));
}

#[test]
fn test_timeout_with_captured_output_and_forked_sleep() {
    let _guard = serial();
    let fx = Fixture::new();
    let hang = fx.add_test("hang.0.mod", "echo partial\nsleep 6\ntrue");
    std::fs::write(format!("{}.stdout", hang.display()), "partial\n").unwrap();
    fx.add_test("next.0.mod", "exit 0");

    let mut config = fx.config();
    config.timeout_secs = Some(1);
    let start = Instant::now();
    let (lines, summary) = fx.run_with(config);

    assert!(start.elapsed() < Duration::from_secs(4), "took {:?}", start.elapsed());
    assert!(fx
        .line_for(&lines, "hang.0.mod")
        .ends_with("test FAILED (timed out in execute)"));
    assert_eq!(summary, RunSummary { passed: 1, failed: 1 });
}

#[test]
fn test_timeout_kills_hung_compiler() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("add.0.mod", "exit 0");
    let compiler = fx.tools.join("slow-compiler");
    write_executable(&compiler, "#!/bin/sh\ncat >/dev/null\nsleep 6\ntrue\n");

    let mut config = fx.config();
    config.toolchain.compiler = compiler;
    config.timeout_secs = Some(1);
    let start = Instant::now();
    let (lines, _) = fx.run_with(config);

    assert!(start.elapsed() < Duration::from_secs(4), "took {:?}", start.elapsed());
    assert!(fx
        .line_for(&lines, "add.0.mod")
        .ends_with("test FAILED (timed out in compile)"));
}

#[test]
fn test_expected_stdout() {
    let _guard = serial();
    let fx = Fixture::new();
    let good = fx.add_test("hello.0.mod", "echo hello");
    std::fs::write(format!("{}.stdout", good.display()), "hello\n").unwrap();
    let bad = fx.add_test("bye.0.mod", "echo goodbye");
    std::fs::write(format!("{}.stdout", bad.display()), "hello\n").unwrap();

    let (lines, summary) = fx.run();
    assert_eq!(lines.len(), 2, "sidecar files are not tests: {:?}", lines);
    assert!(fx
        .line_for(&lines, "hello.0.mod")
        .ends_with("test OK (correct result), got 0"));
    assert!(fx
        .line_for(&lines, "bye.0.mod")
        .ends_with("test FAILED (wrong output)"));
    assert_eq!(summary, RunSummary { passed: 1, failed: 1 });
}

#[test]
fn test_non_utf8_sidecar_does_not_abort_run() {
    let _guard = serial();
    let fx = Fixture::new();
    let raw = fx.add_test("raw.0.mod", "printf '\\377\\n'");
    std::fs::write(format!("{}.stdout", raw.display()), b"\xff\n").unwrap();
    fx.add_test("add.0.mod", "exit 0");

    let (lines, summary) = fx.run();
    assert_eq!(lines.len(), 2, "{:?}", lines);
    assert!(fx
        .line_for(&lines, "raw.0.mod")
        .ends_with("test OK (correct result), got 0"));
    assert!(fx
        .line_for(&lines, "add.0.mod")
        .ends_with("test OK (correct result), got 0"));
    assert_eq!(summary, RunSummary { passed: 2, failed: 0 });
}

#[test]
fn test_stdout_compared_byte_for_byte() {
    let _guard = serial();
    let fx = Fixture::new();
    // 0xFF を置換文字に変換して比較すると誤って一致する
    let raw = fx.add_test("raw.0.mod", "printf '\\377\\n'");
    std::fs::write(format!("{}.stdout", raw.display()), "\u{FFFD}\n").unwrap();

    let (lines, _) = fx.run();
    assert!(fx
        .line_for(&lines, "raw.0.mod")
        .ends_with("test FAILED (wrong output)"));
}

#[test]
fn test_mixed_corpus_one_line_per_test() {
    let _guard = serial();
    let fx = Fixture::new();
    fx.add_test("add.0.mod", "exit 0");
    fx.add_test("sub.5.mod", "exit 3");
    fx.add_test("loop.mod", "exit 17");
    fx.add_test("broken.mod", "SYNTAX");
    fx.add_test("link.0.mod", "# MALFORMED");
    std::fs::write(fx.corpus.join("README.txt"), "not a test").unwrap();

    let (lines, summary) = fx.run();
    assert_eq!(lines.len(), 5);
    assert_eq!(summary, RunSummary { passed: 2, failed: 3 });
}
