// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use vedirect::Block;

const RESET: &str = "\x1b[0m";
const BOLD_MAGENTA: &str = "\x1b[1;35m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_YELLOW: &str = "\x1b[1;33m";

pub fn print_block(index: usize, block: &Block) {
    println!("\n{RESET}{BOLD_MAGENTA} ┏━━━━━━━━━━━━━━━━┓");
    println!("{RESET}{BOLD_RED}{RESET} ┃ {BOLD_GREEN}{:<9} {RESET}{BOLD_RED}{RESET}┃", format!("Block_{index}"));
    println!("{RESET}{BOLD_YELLOW} ┗━━━━━━━━━━━━━━━━┛");

    for (key, value) in block {
        println!(" {BOLD_GREEN} {key:<16} {value}{RESET}");
    }
}

pub fn print_candidate_ports(candidates: &[(String, bool)]) {
    println!("\n{BOLD_MAGENTA}Candidate serial ports{RESET}");
    for (path, valid) in candidates {
        let marker = if *valid {
            format!("{BOLD_GREEN}valid{RESET}")
        } else {
            format!("{BOLD_RED}unrecognized{RESET}")
        };
        println!(" {path:<24} {marker}");
    }
}

pub fn print_reconnected(port: &str) {
    println!("{BOLD_GREEN}reconnected on {port}{RESET}");
}
