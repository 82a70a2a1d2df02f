//! Windows probe built on PDH performance counters and process handles.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{CloseHandle, ERROR_SUCCESS, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Performance::{
    PdhAddEnglishCounterW, PdhCloseQuery, PdhCollectQueryData, PdhGetFormattedCounterValue,
    PdhOpenQueryW, PDH_FMT_COUNTERVALUE, PDH_FMT_DOUBLE, PDH_FMT_LARGE, PDH_HCOUNTER, PDH_HQUERY,
};
use windows_sys::Win32::System::SystemInformation::{
    GetSystemInfo, GlobalMemoryStatusEx, MEMORYSTATUSEX, SYSTEM_INFO,
};
use windows_sys::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, QueryFullProcessImageNameW, TerminateProcess,
    WaitForSingleObject, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_SYNCHRONIZE, PROCESS_TERMINATE,
};

use crate::domain::{CpuLoad, DeviceInfo, NetworkCounters, ResourceSample};
use crate::ports::{
    Liveness, ProbeError, ProbeResult, ProcessSignaller, ResourceProbe, SignalError, SystemSource,
};

fn wide(value: &str) -> Vec<u16> {
    OsStr::new(value).encode_wide().chain(Some(0)).collect()
}

/// One PDH query holding every counter read per poll
struct CounterQuery {
    query: PDH_HQUERY,
    handles: PDH_HCOUNTER,
    threads: PDH_HCOUNTER,
    working_set: PDH_HCOUNTER,
    virtual_bytes: PDH_HCOUNTER,
    processor_time: PDH_HCOUNTER,
}

impl CounterQuery {
    fn open(instance: &str) -> ProbeResult<Self> {
        let mut query: PDH_HQUERY = ptr::null_mut();
        let status = unsafe { PdhOpenQueryW(ptr::null(), 0, &mut query) };
        if status != ERROR_SUCCESS {
            return Err(ProbeError::Counter(format!("PdhOpenQuery failed: {:#x}", status)));
        }

        let mut this = Self {
            query,
            handles: ptr::null_mut(),
            threads: ptr::null_mut(),
            working_set: ptr::null_mut(),
            virtual_bytes: ptr::null_mut(),
            processor_time: ptr::null_mut(),
        };
        this.handles = this.add(instance, "Handle Count")?;
        this.threads = this.add(instance, "Thread Count")?;
        this.working_set = this.add(instance, "Working Set")?;
        this.virtual_bytes = this.add(instance, "Virtual Bytes")?;
        this.processor_time = this.add(instance, "% Processor Time")?;
        Ok(this)
    }

    fn add(&self, instance: &str, counter: &str) -> ProbeResult<PDH_HCOUNTER> {
        let path = wide(&format!("\\Process({})\\{}", instance, counter));
        let mut handle: PDH_HCOUNTER = ptr::null_mut();
        let status = unsafe { PdhAddEnglishCounterW(self.query, path.as_ptr(), 0, &mut handle) };
        if status != ERROR_SUCCESS {
            return Err(ProbeError::Counter(format!(
                "PdhAddCounter {} for {} failed: {:#x}",
                counter, instance, status
            )));
        }
        Ok(handle)
    }

    fn collect(&self) -> ProbeResult<()> {
        let status = unsafe { PdhCollectQueryData(self.query) };
        if status != ERROR_SUCCESS {
            return Err(ProbeError::Counter(format!("PdhCollectQueryData failed: {:#x}", status)));
        }
        Ok(())
    }

    fn large(&self, counter: PDH_HCOUNTER) -> ProbeResult<u64> {
        let mut value: PDH_FMT_COUNTERVALUE = unsafe { std::mem::zeroed() };
        let status =
            unsafe { PdhGetFormattedCounterValue(counter, PDH_FMT_LARGE, ptr::null_mut(), &mut value) };
        if status != ERROR_SUCCESS || value.CStatus != ERROR_SUCCESS {
            return Err(ProbeError::Counter(format!("counter read failed: {:#x}", status)));
        }
        Ok(unsafe { value.Anonymous.largeValue }.max(0) as u64)
    }

    /// Rate counters need two collections; the first read reports `None`.
    fn double(&self, counter: PDH_HCOUNTER) -> Option<f64> {
        let mut value: PDH_FMT_COUNTERVALUE = unsafe { std::mem::zeroed() };
        let status =
            unsafe { PdhGetFormattedCounterValue(counter, PDH_FMT_DOUBLE, ptr::null_mut(), &mut value) };
        if status != ERROR_SUCCESS || value.CStatus != ERROR_SUCCESS {
            return None;
        }
        Some(unsafe { value.Anonymous.doubleValue })
    }
}

impl Drop for CounterQuery {
    fn drop(&mut self) {
        unsafe {
            PdhCloseQuery(self.query);
        }
    }
}

/// Process handle opened once per PID and the counters bound to it
struct Tracked {
    handle: HANDLE,
    query: Option<CounterQuery>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.query = None;
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

/// Resource probe backed by PDH
pub struct PdhProbe {
    cpu_count: u32,
    tracked: HashMap<u32, Tracked>,
}

impl PdhProbe {
    pub fn new() -> Self {
        Self {
            cpu_count: system_info().dwNumberOfProcessors.max(1),
            tracked: HashMap::new(),
        }
    }

    fn track(&mut self, pid: u32) -> ProbeResult<&mut Tracked> {
        if !self.tracked.contains_key(&pid) {
            let access = PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_SYNCHRONIZE | PROCESS_TERMINATE;
            let handle = unsafe { OpenProcess(access, 0, pid) };
            if handle.is_null() {
                return Err(ProbeError::ProcessGone(pid));
            }
            self.tracked.insert(pid, Tracked { handle, query: None });
        }
        self.tracked.get_mut(&pid).ok_or(ProbeError::ProcessGone(pid))
    }

    fn exit_code(handle: HANDLE) -> Option<i32> {
        match unsafe { WaitForSingleObject(handle, 0) } {
            WAIT_TIMEOUT => None,
            WAIT_OBJECT_0 => {
                let mut code: u32 = 0;
                if unsafe { GetExitCodeProcess(handle, &mut code) } == 0 {
                    Some(-1)
                } else {
                    Some(code as i32)
                }
            }
            other => {
                warn!("WaitForSingleObject returned {:#x}", other);
                Some(-1)
            }
        }
    }
}

impl Default for PdhProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// PDH names process instances after the image file stem
fn instance_name(handle: HANDLE) -> ProbeResult<String> {
    let mut buffer = [0u16; 1024];
    let mut size = buffer.len() as u32;
    let ok = unsafe {
        QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, buffer.as_mut_ptr(), &mut size)
    };
    if ok == 0 {
        return Err(ProbeError::Counter("QueryFullProcessImageName failed".to_string()));
    }

    let image = String::from_utf16_lossy(&buffer[..size as usize]);
    Path::new(&image)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| ProbeError::Parse(format!("no file name in {}", image)))
}

fn system_info() -> SYSTEM_INFO {
    let mut info: SYSTEM_INFO = unsafe { std::mem::zeroed() };
    unsafe { GetSystemInfo(&mut info) };
    info
}

impl ResourceProbe for PdhProbe {
    fn liveness(&mut self, pid: u32) -> Liveness {
        let handle = match self.track(pid) {
            Ok(tracked) => tracked.handle,
            Err(_) => return Liveness::Gone,
        };
        match Self::exit_code(handle) {
            None => Liveness::Alive,
            Some(code) => Liveness::Exited(code),
        }
    }

    fn sample(&mut self, pid: u32) -> ProbeResult<ResourceSample> {
        let cpu_count = self.cpu_count;
        let tracked = self.track(pid)?;
        if Self::exit_code(tracked.handle).is_some() {
            return Err(ProbeError::ProcessGone(pid));
        }

        if tracked.query.is_none() {
            let instance = instance_name(tracked.handle)?;
            debug!(pid, instance = %instance, "Opening PDH query");
            tracked.query = Some(CounterQuery::open(&instance)?);
        }
        let query = tracked
            .query
            .as_ref()
            .ok_or_else(|| ProbeError::Counter("query not open".to_string()))?;

        query.collect()?;
        let handles = query.large(query.handles)?;
        let threads = query.large(query.threads)?;
        let working_set = query.large(query.working_set)?;
        let virtual_bytes = query.large(query.virtual_bytes)?;
        // % Processor Time is summed over cores
        let cpu_load = match query.double(query.processor_time) {
            Some(value) => CpuLoad::measured(value / f64::from(cpu_count)),
            None => CpuLoad::Unknown,
        };

        Ok(ResourceSample::new(threads as u32, working_set, handles as u32, cpu_load)
            .with_virtual(virtual_bytes))
    }

    fn network(&mut self, _pid: u32) -> ProbeResult<NetworkCounters> {
        Err(ProbeError::Unsupported("per-process network counters"))
    }

    fn find_pid(&self, _image_name: &str, _group: u32) -> Option<u32> {
        // CreateProcess returns the final PID; there is no re-exec to chase
        None
    }

    fn forget(&mut self, pid: u32) {
        self.tracked.remove(&pid);
    }
}

impl ProcessSignaller for PdhProbe {
    fn request_stop(&mut self, pid: u32) -> Result<(), SignalError> {
        self.kill(pid)
    }

    fn kill(&mut self, pid: u32) -> Result<(), SignalError> {
        let handle = match self.track(pid) {
            Ok(tracked) => tracked.handle,
            // Already gone: nothing left to stop
            Err(_) => return Ok(()),
        };
        if Self::exit_code(handle).is_some() {
            return Ok(());
        }
        if unsafe { TerminateProcess(handle, 1) } == 0 {
            return Err(SignalError {
                pid,
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }
}

/// System source implementation using Win32 system information
#[derive(Debug, Default)]
pub struct WindowsSystemSource;

impl SystemSource for WindowsSystemSource {
    fn device_info(&self) -> ProbeResult<DeviceInfo> {
        let mut status: MEMORYSTATUSEX = unsafe { std::mem::zeroed() };
        status.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;
        if unsafe { GlobalMemoryStatusEx(&mut status) } == 0 {
            return Err(ProbeError::Counter(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(DeviceInfo::new(system_info().dwNumberOfProcessors, status.ullAvailPhys))
    }
}
