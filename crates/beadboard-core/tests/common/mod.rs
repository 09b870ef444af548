//! Shared fixtures for the store and pipeline integration tests.

// Not every test binary exercises every fixture.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use im::Vector;

use beadboard_core::{
    Error, Issue, IssueClient, IssueStatus, IssueType, IssueWithDeps, Result,
};

pub fn issue(id: &str, status: IssueStatus) -> Issue {
    Issue {
        id: id.to_string(),
        title: format!("Issue {id}"),
        status,
        issue_type: None,
        parent: None,
        priority: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        closed_at: None,
    }
}

pub fn epic(id: &str) -> Issue {
    let mut root = issue(id, IssueStatus::Open);
    root.issue_type = Some(IssueType::Epic);
    root
}

pub fn with_deps(issue: Issue, depends_on: &[&str]) -> IssueWithDeps {
    IssueWithDeps {
        issue,
        depends_on: depends_on.iter().map(ToString::to_string).collect(),
    }
}

type Scripted<T> = VecDeque<(Duration, std::result::Result<T, String>)>;

/// Scriptable [`IssueClient`] double.
///
/// Each `list`/`list_with_deps` call pops the next scripted step
/// (latency + result) if one is queued, otherwise answers with the
/// default payload immediately. Latency is simulated with tokio
/// timers, so paused-clock tests stay instantaneous.
#[derive(Default)]
pub struct FakeClient {
    default_issues: Mutex<Vector<Issue>>,
    default_deps: Mutex<Vector<IssueWithDeps>>,
    list_script: Mutex<Scripted<Vector<Issue>>>,
    deps_script: Mutex<Scripted<Vector<IssueWithDeps>>>,
    update_error: Mutex<Option<String>>,
    update_delay: Mutex<Duration>,
    pub list_calls: AtomicUsize,
    pub update_calls: Mutex<Vec<(String, IssueStatus)>>,
}

impl FakeClient {
    pub fn with_issues(issues: impl IntoIterator<Item = Issue>) -> Self {
        let client = Self::default();
        client.set_issues(issues);
        client
    }

    pub fn set_issues(&self, issues: impl IntoIterator<Item = Issue>) {
        *lock(&self.default_issues) = issues.into_iter().collect();
    }

    pub fn set_deps(&self, deps: impl IntoIterator<Item = IssueWithDeps>) {
        *lock(&self.default_deps) = deps.into_iter().collect();
    }

    /// Queue one `list` response with a simulated latency.
    pub fn script_list(&self, latency: Duration, result: std::result::Result<Vec<Issue>, &str>) {
        lock(&self.list_script).push_back((
            latency,
            result
                .map(Vector::from)
                .map_err(ToString::to_string),
        ));
    }

    /// Queue one `list_with_deps` response with a simulated latency.
    pub fn script_deps(
        &self,
        latency: Duration,
        result: std::result::Result<Vec<IssueWithDeps>, &str>,
    ) {
        lock(&self.deps_script).push_back((
            latency,
            result
                .map(Vector::from)
                .map_err(ToString::to_string),
        ));
    }

    /// Make every subsequent `update_status` call fail.
    pub fn fail_updates(&self, reason: &str) {
        *lock(&self.update_error) = Some(reason.to_string());
    }

    /// Simulated latency for `update_status`, for in-flight-edit tests.
    pub fn set_update_delay(&self, delay: Duration) {
        *lock(&self.update_delay) = delay;
    }

    pub fn update_call_count(&self) -> usize {
        lock(&self.update_calls).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl IssueClient for FakeClient {
    async fn list(&self) -> Result<Vector<Issue>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let step = lock(&self.list_script).pop_front();
        match step {
            Some((latency, result)) => {
                tokio::time::sleep(latency).await;
                result.map_err(Error::fetch)
            }
            None => Ok(lock(&self.default_issues).clone()),
        }
    }

    async fn get(&self, id: &str) -> Result<Issue> {
        lock(&self.default_issues)
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }

    async fn list_with_deps(&self) -> Result<Vector<IssueWithDeps>> {
        let step = lock(&self.deps_script).pop_front();
        match step {
            Some((latency, result)) => {
                tokio::time::sleep(latency).await;
                result.map_err(Error::derived_fetch)
            }
            None => Ok(lock(&self.default_deps).clone()),
        }
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        lock(&self.update_calls).push((id.to_string(), status));
        let delay = *lock(&self.update_delay);
        tokio::time::sleep(delay).await;
        match lock(&self.update_error).clone() {
            Some(reason) => Err(Error::update(id, reason)),
            None => {
                let mut issues = lock(&self.default_issues);
                *issues = issues
                    .iter()
                    .cloned()
                    .map(|mut issue| {
                        if issue.id == id {
                            issue.status = status;
                        }
                        issue
                    })
                    .collect();
                Ok(())
            }
        }
    }
}
