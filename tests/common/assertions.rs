#![allow(dead_code)]

/// Assert a rendered command contains a fragment, with a readable failure.
pub fn assert_cmd_contains(cmd: &str, needle: &str) {
    assert!(
        cmd.contains(needle),
        "expected command to contain '{needle}'\ncommand: {cmd}"
    );
}

pub fn assert_cmd_not_contains(cmd: &str, needle: &str) {
    assert!(
        !cmd.contains(needle),
        "expected command to NOT contain '{needle}'\ncommand: {cmd}"
    );
}
