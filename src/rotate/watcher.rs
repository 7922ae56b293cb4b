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
use std::sync::atomic::AtomicBool;

use crate::rotate::RotationBroadcast;
use crate::rotate::Wake;
use crate::rotate::trigger::RotationTrigger;

/// Forwards every broadcast into the rotation trigger of one logger.
#[derive(Debug)]
pub(crate) struct RotationWatcher {
    broadcast: Arc<RotationBroadcast>,
    trigger: Arc<RotationTrigger>,
}

impl RotationWatcher {
    pub(crate) fn new(broadcast: Arc<RotationBroadcast>, trigger: Arc<RotationTrigger>) -> Self {
        Self { broadcast, trigger }
    }

    pub(crate) fn run(self, cancelled: &AtomicBool) {
        while self.broadcast.wait(cancelled) == Wake::Rotate {
            self.trigger.request();
        }
    }
}
