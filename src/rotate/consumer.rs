// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use crate::Error;
use crate::Trap;
use crate::rotate::SharedRotator;
use crate::rotate::lock_rotator;
use crate::rotate::trigger::RotationTrigger;

/// Drains the rotation trigger of one logger, so rotations of a logger never overlap.
#[derive(Debug)]
pub(crate) struct RotationConsumer {
    trigger: Arc<RotationTrigger>,
    rotator: SharedRotator,
    trap: Arc<dyn Trap>,
}

impl RotationConsumer {
    pub(crate) fn new(
        trigger: Arc<RotationTrigger>,
        rotator: SharedRotator,
        trap: Arc<dyn Trap>,
    ) -> Self {
        Self {
            trigger,
            rotator,
            trap,
        }
    }

    /// Runs until the trigger is closed. Failed rotations are trapped and the loop goes on.
    pub(crate) fn run(self) {
        while self.trigger.wait() {
            let result = lock_rotator(&self.rotator).rotate();
            if let Err(err) = result {
                let err = Error::new("failed to rotate log file").with_source(err);
                self.trap.trap(&err);
            }
        }
    }
}
