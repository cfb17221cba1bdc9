// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ast::{ExprId, FunctionDecl};

use log_derive::logfn_inputs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// One activation of a function body. Frames are canonical: the LocationContextManager hands out
/// a single instance for every distinct (function, parent, call site, block count) combination,
/// so the id identifies the frame.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StackFrameContext {
    pub id: u32,
    pub function: Rc<FunctionDecl>,
    /// The frame of the caller, if this frame is the result of inlining a call.
    pub parent: Option<Rc<StackFrameContext>>,
    /// The call expression in the parent frame.
    pub call_site: Option<ExprId>,
    /// Distinguishes repeated calls from the same call site.
    pub block_count: u32,
}

impl Debug for StackFrameContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("SF{}<{:?}>", self.id, self.function))
    }
}

impl StackFrameContext {
    /// True if self is a strict ancestor of other.
    pub fn is_parent_of(&self, other: &StackFrameContext) -> bool {
        let mut current = other.parent.as_ref();
        while let Some(frame) = current {
            if frame.id == self.id {
                return true;
            }
            current = frame.parent.as_ref();
        }
        false
    }

    /// The number of frames between self and the root frame.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_ref();
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent.as_ref();
        }
        depth
    }
}

type FrameKey = (u32, Option<u32>, Option<ExprId>, u32);

/// Hash-conses stack frames.
#[derive(Default)]
pub struct LocationContextManager {
    frames: HashMap<FrameKey, Rc<StackFrameContext>>,
}

impl Debug for LocationContextManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("LocationContextManager({} frames)", self.frames.len()))
    }
}

impl LocationContextManager {
    pub fn new() -> LocationContextManager {
        LocationContextManager::default()
    }

    /// Returns the canonical frame for the given function activation.
    #[logfn_inputs(TRACE)]
    pub fn get_stack_frame(
        &mut self,
        function: Rc<FunctionDecl>,
        parent: Option<Rc<StackFrameContext>>,
        call_site: Option<ExprId>,
        block_count: u32,
    ) -> Rc<StackFrameContext> {
        let key = (
            function.id,
            parent.as_ref().map(|p| p.id),
            call_site,
            block_count,
        );
        let next_id = self.frames.len() as u32;
        self.frames
            .entry(key)
            .or_insert_with(|| {
                Rc::new(StackFrameContext {
                    id: next_id,
                    function,
                    parent,
                    call_site,
                    block_count,
                })
            })
            .clone()
    }

    /// Returns the canonical root frame for the given function.
    #[logfn_inputs(TRACE)]
    pub fn get_root_frame(&mut self, function: Rc<FunctionDecl>) -> Rc<StackFrameContext> {
        self.get_stack_frame(function, None, None, 0)
    }
}
