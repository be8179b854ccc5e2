#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, unreachable_pub)]
/*!

`logic-net`

A combinational logic network builder and evaluator.

A [Network](network::Network) owns gates (AND, OR, NOT, XOR) and terminals.
Gates are wired to terminals and to each other, then evaluated from a set of
root gates. Every gate is computed at most once, even when it feeds several
consumers. With the `graph` feature, the network can be exported as a DOT
diagram.

## Half adder

```
use logic_net::circuit::Operator;
use logic_net::network::{Network, OutputGroup};

let mut netlist = Network::new("half_adder".to_string());
let a = netlist.create_input(true);
let b = netlist.create_input(true);

let sum = netlist
    .insert_gate(Operator::Xor, "sum".into(), &[a.into(), b.into()])
    .unwrap();
let carry = netlist
    .insert_gate(Operator::And, "carry".into(), &[a.into(), b.into()])
    .unwrap();

let outputs = OutputGroup::from(vec![sum, carry]);
let values = netlist.evaluate_outputs(&outputs).unwrap();
assert!(!values[0]);
assert!(values[1]);
```

*/

pub mod circuit;
#[cfg(feature = "graph")]
pub mod diagram;
pub mod error;
pub mod eval;
pub mod graph;
pub mod network;
pub mod sink;
pub mod util;
