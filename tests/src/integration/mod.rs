//! Gateway, ledger and client exercised together over real sockets.

#[cfg(test)]
pub mod harness;

#[cfg(test)]
mod broadcast;
#[cfg(test)]
mod flows;
