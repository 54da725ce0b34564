//! A simulated HX711 behind `embedded-hal` pins.
//!
//! The clock pin, data pin and delay share one [`Device`]. Time only moves
//! when the driver sleeps, which is enough to check pulse widths, settle
//! delays and the power down threshold.

#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc};

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType, InputPin, OutputPin},
};

const POWER_DOWN_NS: u64 = 60_000;

/// What the simulated chip saw during one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub value: i32,
    /// Pulses after the 24 data bits
    pub trailing: u8,
    /// Pulse count that selected this conversion's channel
    pub armed_by: u8,
    pub longest_high_ns: u64,
    pub duration_ns: u64,
}

struct OpenFrame {
    value: i32,
    pulses: u8,
    started_ns: u64,
    last_edge_ns: u64,
    longest_high_ns: u64,
}

#[derive(Default)]
struct Device {
    now_ns: u64,
    clock_high: bool,
    high_since_ns: u64,
    asleep: bool,
    power_downs: usize,
    /// Trailing pulse count the current conversion was armed with
    mode: u8,
    samples_a: VecDeque<i32>,
    samples_b: VecDeque<i32>,
    frame: Option<OpenFrame>,
    frames: Vec<Frame>,
}

impl Device {
    fn queue(&mut self) -> &mut VecDeque<i32> {
        match self.mode {
            2 => &mut self.samples_b,
            _ => &mut self.samples_a,
        }
    }

    fn rising_edge(&mut self) {
        self.settle();
        self.clock_high = true;
        self.high_since_ns = self.now_ns;

        if self.asleep {
            return;
        }

        if self.frame.is_none() {
            let next = self.queue().front().copied();
            if let Some(value) = next {
                self.frame = Some(OpenFrame {
                    value,
                    pulses: 0,
                    started_ns: self.now_ns,
                    last_edge_ns: self.now_ns,
                    longest_high_ns: 0,
                });
            }
        }

        if let Some(frame) = self.frame.as_mut() {
            frame.pulses += 1;
        }
    }

    fn falling_edge(&mut self) {
        self.clock_high = false;
        let high_ns = self.now_ns - self.high_since_ns;

        if let Some(frame) = self.frame.as_mut() {
            frame.longest_high_ns = frame.longest_high_ns.max(high_ns);
            frame.last_edge_ns = self.now_ns;
        }

        if self.asleep {
            // Waking up aborts the conversion and resets to channel A, gain 128
            self.asleep = false;
            self.frame = None;
            self.mode = 1;
        }
    }

    fn sleep(&mut self, ns: u64) {
        self.now_ns += ns;

        if self.clock_high && !self.asleep && self.now_ns - self.high_since_ns >= POWER_DOWN_NS {
            self.asleep = true;
            self.power_downs += 1;
        }
    }

    /// Closes a finished frame once the clock is back low, which arms the
    /// next conversion
    fn settle(&mut self) {
        let finished = matches!(&self.frame, Some(frame) if frame.pulses > 24 && !self.clock_high);
        if !finished {
            return;
        }

        let Some(frame) = self.frame.take() else {
            return;
        };
        let trailing = frame.pulses - 24;
        self.frames.push(Frame {
            value: frame.value,
            trailing,
            armed_by: self.mode,
            longest_high_ns: frame.longest_high_ns,
            duration_ns: frame.last_edge_ns - frame.started_ns,
        });
        self.queue().pop_front();
        self.mode = trailing;
    }

    fn dout_high(&mut self) -> bool {
        self.settle();

        if self.asleep {
            return true;
        }

        if let Some(frame) = &self.frame {
            if self.clock_high && (1..=24).contains(&frame.pulses) {
                let bit = 24 - frame.pulses;
                return (frame.value as u32 >> bit) & 1 == 1;
            }
            return true;
        }

        self.queue().is_empty()
    }
}

#[derive(Clone)]
pub struct Sim(Rc<RefCell<Device>>);

impl Sim {
    pub fn new() -> Self {
        Sim(Rc::new(RefCell::new(Device {
            mode: 1,
            ..Device::default()
        })))
    }

    pub fn pins(&self) -> (SimData, SimClock, SimDelay) {
        (
            SimData(self.clone()),
            SimClock(self.clone()),
            SimDelay(self.clone()),
        )
    }

    pub fn push_a(&self, samples: &[i32]) {
        self.0.borrow_mut().samples_a.extend(samples);
    }

    pub fn push_b(&self, samples: &[i32]) {
        self.0.borrow_mut().samples_b.extend(samples);
    }

    pub fn remaining_a(&self) -> usize {
        self.0.borrow().samples_a.len()
    }

    pub fn remaining_b(&self) -> usize {
        self.0.borrow().samples_b.len()
    }

    /// Completed reads, oldest first
    pub fn frames(&self) -> Vec<Frame> {
        let mut device = self.0.borrow_mut();
        device.settle();
        device.frames.clone()
    }

    /// Trailing pulse count the next conversion will be read with
    pub fn armed(&self) -> u8 {
        let mut device = self.0.borrow_mut();
        device.settle();
        device.mode
    }

    pub fn now_ns(&self) -> u64 {
        self.0.borrow().now_ns
    }

    pub fn asleep(&self) -> bool {
        self.0.borrow().asleep
    }

    pub fn power_downs(&self) -> usize {
        self.0.borrow().power_downs
    }

    pub fn clock_high(&self) -> bool {
        self.0.borrow().clock_high
    }
}

pub struct SimData(Sim);

pub struct SimClock(Sim);

pub struct SimDelay(Sim);

impl ErrorType for SimData {
    type Error = Infallible;
}

impl InputPin for SimData {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0 .0.borrow_mut().dout_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0 .0.borrow_mut().dout_high())
    }
}

impl ErrorType for SimClock {
    type Error = Infallible;
}

impl OutputPin for SimClock {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut device = self.0 .0.borrow_mut();
        if device.clock_high {
            device.falling_edge();
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut device = self.0 .0.borrow_mut();
        if !device.clock_high {
            device.rising_edge();
        }
        Ok(())
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0 .0.borrow_mut().sleep(u64::from(ns));
    }
}

#[cfg(feature = "embedded-hal-async")]
impl embedded_hal_async::digital::Wait for SimData {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        assert!(self.is_high()?, "DOUT never goes high on its own");
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        // Nothing queues samples while the driver waits
        assert!(self.is_low()?, "no conversion queued");
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        unimplemented!("edges are not simulated")
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        unimplemented!("edges are not simulated")
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        unimplemented!("edges are not simulated")
    }
}

#[cfg(feature = "embedded-hal-async")]
impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0 .0.borrow_mut().sleep(u64::from(ns));
    }
}
