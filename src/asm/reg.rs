use std::fmt::Display;

/// The x86-64 registers the generated code touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rcx,
    Rbp,
    Rsp,
    /// Low byte of `rax`, target of the `set{cc}` family.
    Al,
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Reg::Rax => "%rax",
            Reg::Rcx => "%rcx",
            Reg::Rbp => "%rbp",
            Reg::Rsp => "%rsp",
            Reg::Al => "%al",
        })
    }
}
