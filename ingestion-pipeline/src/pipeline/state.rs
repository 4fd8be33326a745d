use state_machines::state_machine;

state_machine! {
    name: BatchMachine,
    state: BatchState,
    initial: Idle,
    states: [Idle, Extracting, Enriching, Persisting, Done, Failed],
    events {
        start_extraction { transition: { from: Idle, to: Extracting } }
        start_enrichment { transition: { from: Extracting, to: Enriching } }
        start_persistence { transition: { from: Enriching, to: Persisting } }
        finish { transition: { from: Persisting, to: Done } }
        abort {
            transition: { from: Idle, to: Failed }
            transition: { from: Extracting, to: Failed }
            transition: { from: Persisting, to: Failed }
        }
    }
}

pub fn idle() -> BatchMachine<(), Idle> {
    BatchMachine::new(())
}
