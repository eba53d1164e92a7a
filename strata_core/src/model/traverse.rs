// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack traversal.

use super::id::{INVALID, LayerId};
use super::store::Model;

/// An iterator walking down a stack of layers along `below` links.
///
/// Created by [`Model::stack`].
#[derive(Debug)]
pub struct Stack<'a> {
    model: &'a Model,
    current: u32,
    remaining: usize,
}

impl<'a> Stack<'a> {
    pub(crate) fn new(model: &'a Model, top: u32) -> Self {
        Self {
            model,
            current: top,
            remaining: model.len(),
        }
    }
}

impl Iterator for Stack<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let idx = self.current;
        self.current = self.model.below[idx as usize];
        Some(LayerId {
            idx,
            generation: self.model.generation[idx as usize],
        })
    }
}
