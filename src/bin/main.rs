use logic_net::circuit::Operator;
use logic_net::error::NetworkError;
use logic_net::eval::Evaluator;
use logic_net::network::{Network, OutputGroup};
use logic_net::sink::TracingSink;
use tracing_subscriber::EnvFilter;

/// A full adder with A = 1, B = 0 and carry-in C = 0.
///
/// sum   = (A ^ B) ^ C
/// carry = ((A ^ B) & C) | (A & B)
fn full_adder() -> Result<(Network, OutputGroup), NetworkError> {
    let mut netlist = Network::new("full_adder".to_string());

    let a = netlist.create_input(true);
    let b = netlist.create_input(false);
    let c = netlist.create_input(false);

    let half_sum = netlist.insert_gate(Operator::Xor, "lb_5".into(), &[a.into(), b.into()])?;
    let generate = netlist.insert_gate(Operator::And, "lb_4".into(), &[a.into(), b.into()])?;
    let propagate =
        netlist.insert_gate(Operator::And, "lb_3".into(), &[c.into(), half_sum.into()])?;
    let sum = netlist.insert_gate(Operator::Xor, "lb_2".into(), &[half_sum.into(), c.into()])?;
    let carry = netlist.insert_gate(
        Operator::Or,
        "lb_1".into(),
        &[propagate.into(), generate.into()],
    )?;
    netlist.set_label(sum, "SUM".to_string())?;
    netlist.set_label(carry, "CARRY".to_string())?;

    Ok((netlist, OutputGroup::from(vec![carry, sum])))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (mut netlist, outputs) = full_adder()?;
    print!("{netlist}");

    let values = Evaluator::new(&mut netlist)
        .with_sink(TracingSink)
        .evaluate_outputs(&outputs)?;
    println!("CARRY = {}, SUM = {}", u8::from(values[0]), u8::from(values[1]));

    #[cfg(feature = "graph")]
    {
        let destination = std::env::args()
            .nth(1)
            .unwrap_or_else(|| "full_adder.dot".to_string());
        logic_net::diagram::export_diagram(&netlist, &outputs, &destination)?;
        println!("Diagram written to {destination}");
    }

    Ok(())
}
