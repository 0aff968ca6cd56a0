//! Core adapter tests.
//!
//! Drives a [`CoreSystem`] wrapped around a mock core through a real bus and
//! memory, recording the inputs the core sees each cycle.

use std::sync::{Arc, Mutex};

use rvex_sim::config::{CoreConfig, MemoryConfig};
use rvex_sim::sim::{Entity, Flow};
use rvex_sim::soc::core::{CoreInputs, CoreOutputs, CoreSystem, MemoryState};
use rvex_sim::soc::interconnect::demux;
use rvex_sim::soc::interconnect::signals::{BusRequest, MasterHandle, RequestState, ResponseState};
use rvex_sim::soc::interconnect::Bus;
use rvex_sim::soc::memory::Memory;

use crate::common::bench::step;
use crate::common::mocks::core::MockCore;

const DEBUG_BASE: u32 = 0xD000_0000;

struct CoreBench {
    core: CoreSystem<MockCore>,
    memory: Memory,
    bus: Bus,
    host: MasterHandle,
}

impl CoreBench {
    fn new(model: MockCore, reset_cycles: u32) -> Self {
        let mut bus = Bus::new("bus");
        let host = bus.add_master();
        let core_master = bus.add_master();
        let debug_slave = bus.add_slave(demux::range(DEBUG_BASE, 0x400));
        let memory_port = bus.add_slave(demux::range(0, 1 << 16));
        let memory = Memory::new(
            "memory",
            &MemoryConfig {
                address_bits: 16,
                ..MemoryConfig::default()
            },
            memory_port,
        );
        let config = CoreConfig {
            lane_groups: 2,
            reset_cycles,
            ..CoreConfig::default()
        };
        let mut core = CoreSystem::new("core", model, &config, debug_slave, core_master);
        core.init().unwrap();
        Self {
            core,
            memory,
            bus,
            host,
        }
    }

    fn step(&mut self) -> Flow {
        step(&mut [&mut self.core, &mut self.memory, &mut self.bus]);
        self.core.synchronize()
    }
}

/// A mock that records its inputs and replies with `script(cycle, inputs)`.
fn recording_core(
    script: impl Fn(usize, &CoreInputs) -> CoreOutputs + Send + 'static,
) -> (MockCore, Arc<Mutex<Vec<CoreInputs>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut model = MockCore::new();
    let _ = model.expect_clock().returning(move |inputs| {
        let mut log = log.lock().unwrap();
        let outputs = script(log.len(), inputs);
        log.push(inputs.clone());
        outputs
    });
    (model, seen)
}

#[test]
fn reset_is_held_for_configured_cycles() {
    let (model, seen) = recording_core(|_, _| CoreOutputs::default());
    let mut bench = CoreBench::new(model, 3);
    for _ in 0..5 {
        let _ = bench.step();
    }
    let resets: Vec<bool> = seen.lock().unwrap().iter().map(|i| i.reset).collect();
    assert_eq!(resets, vec![true, true, true, false, false]);
}

#[test]
fn stall_vector_has_one_entry_per_lane_group() {
    let (model, seen) = recording_core(|_, _| CoreOutputs {
        stall: vec![false, true],
        ..CoreOutputs::default()
    });
    let mut bench = CoreBench::new(model, 0);
    let _ = bench.step();
    assert_eq!(seen.lock().unwrap()[0].stall, vec![false, false]);
    assert_eq!(bench.core.stall_out(), &[false, true]);
}

#[test]
fn memory_request_is_served_and_stalls_the_core() {
    let (model, seen) = recording_core(|cycle, _| CoreOutputs {
        memory_request: (cycle == 0).then(|| BusRequest::read(RequestState::Single, 0x80)),
        ..CoreOutputs::default()
    });
    let mut bench = CoreBench::new(model, 0);
    bench.memory.load(0x80, &[0x12, 0x34, 0x56, 0x78]);

    let _ = bench.step();
    assert_eq!(bench.core.memory_state(), MemoryState::Requested);
    for _ in 0..4 {
        let _ = bench.step();
    }
    assert_eq!(bench.core.memory_state(), MemoryState::Idle);

    let seen = seen.lock().unwrap();
    let (index, response) = seen
        .iter()
        .enumerate()
        .find_map(|(i, inputs)| inputs.memory_response.map(|r| (i, r)))
        .unwrap();
    assert_eq!(response.data, 0x1234_5678);
    assert!(!response.fault);
    assert!(seen[1..index].iter().all(|inputs| inputs.stall.iter().all(|s| *s)));
    assert!(seen[index].stall.iter().all(|s| !*s));
}

#[test]
fn unmapped_memory_request_reports_fault() {
    let (model, seen) = recording_core(|cycle, _| CoreOutputs {
        memory_request: (cycle == 0).then(|| BusRequest::read(RequestState::Single, 0x9000_0000)),
        ..CoreOutputs::default()
    });
    let mut bench = CoreBench::new(model, 0);
    for _ in 0..5 {
        let _ = bench.step();
    }
    let response = seen.lock().unwrap().iter().find_map(|i| i.memory_response).unwrap();
    assert!(response.fault);
    assert_eq!(response.data, 0);
}

#[test]
fn requests_during_reset_are_ignored() {
    let (model, _seen) = recording_core(|_, _| CoreOutputs {
        memory_request: Some(BusRequest::read(RequestState::Single, 0x0)),
        ..CoreOutputs::default()
    });
    let mut bench = CoreBench::new(model, 2);
    let _ = bench.step();
    let _ = bench.step();
    assert_eq!(bench.core.memory_state(), MemoryState::Idle);
    let _ = bench.step();
    assert_eq!(bench.core.memory_state(), MemoryState::Requested);
}

#[test]
fn debug_register_reads_are_answered_by_the_core() {
    let (model, seen) = recording_core(|_, inputs| CoreOutputs {
        debug_read_data: if inputs.debug.read_enable { 0xCAFE_0000 | inputs.debug.address } else { 0 },
        ..CoreOutputs::default()
    });
    let mut bench = CoreBench::new(model, 0);
    bench.host.port.lock().request = BusRequest::read(RequestState::Single, DEBUG_BASE + 0x24);

    let mut reply = None;
    for _ in 0..5 {
        let _ = bench.step();
        let mut port = bench.host.port.lock();
        if port.ack {
            port.request = BusRequest::default();
        }
        if port.response.is_done_for(bench.host.id) {
            reply = Some(port.response);
            break;
        }
    }

    let reply = reply.unwrap();
    assert_eq!(reply.state, ResponseState::Ok);
    assert_eq!(reply.data, 0xCAFE_0024);
    assert!(seen.lock().unwrap().iter().any(|i| i.debug.read_enable && i.debug.address == 0x24));
}

#[test]
fn debug_register_writes_reach_the_core() {
    let (model, seen) = recording_core(|_, _| CoreOutputs::default());
    let mut bench = CoreBench::new(model, 0);
    bench.host.port.lock().request = BusRequest::write(RequestState::Single, DEBUG_BASE + 0x8, 0xF, 0x0000_0001);
    for _ in 0..3 {
        let _ = bench.step();
        let mut port = bench.host.port.lock();
        if port.ack {
            port.request = BusRequest::default();
        }
    }
    let seen = seen.lock().unwrap();
    let write = seen.iter().find(|i| i.debug.write_enable).unwrap();
    assert_eq!(write.debug.address, 0x8);
    assert_eq!(write.debug.write_mask, 0xF);
    assert_eq!(write.debug.write_data, 1);
}

#[test]
fn core_error_stops_the_simulation() {
    let (model, _seen) = recording_core(|cycle, _| CoreOutputs {
        error: cycle == 2,
        ..CoreOutputs::default()
    });
    let mut bench = CoreBench::new(model, 0);
    assert_eq!(bench.step(), Flow::Continue);
    assert_eq!(bench.step(), Flow::Continue);
    assert_eq!(bench.step(), Flow::Stop);
}
