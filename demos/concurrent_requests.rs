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
use std::thread;

use logforth_batch::Append;
use logforth_batch::append::BatchStreamBuilder;
use logforth_batch::append::Buffer;
use logforth_batch::layout::TextLayout;
use logforth_batch::record::Level;
use logforth_batch::record::Record;

fn main() {
    let batch = BatchStreamBuilder::url("logs/requests.log")
        .filter(Level::Debug)
        .layout(TextLayout::default())
        .file_permission(0o644)
        .use_locking(true)
        .build()
        .unwrap();
    let batch = Arc::new(batch);

    let workers = (0..4)
        .map(|worker| {
            let batch = batch.clone();
            thread::spawn(move || {
                for request in 0..3 {
                    // one buffer per request: its records land in the file together
                    let buffer = Buffer::new(batch.clone());
                    for step in ["accepted", "queried", "rendered"] {
                        let record = Record::builder()
                            .level(Level::Info)
                            .target("demo::http")
                            .payload(format!("worker {worker} request {request} {step}"))
                            .key_value("worker", worker)
                            .build();
                        buffer.append(&record).unwrap();
                    }
                    buffer.flush().unwrap();
                }
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.join().unwrap();
    }
    batch.close();
}
